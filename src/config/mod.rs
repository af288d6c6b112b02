//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NavigatorConfig (validated)
//!     → Navigator holds it behind an ArcSwap
//!
//! On Navigator::update_config:
//!     → atomic swap of Arc<NavigatorConfig>
//!     → subsequent gestures and navigations observe new config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Config routes cover static templates and pass-through routes only;
//!   loaders and renderers are code

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{NavigatorConfig, ObservabilityConfig, RequestHeaderConfig, RouteConfig};
pub use validation::{validate_config, ValidationError};
