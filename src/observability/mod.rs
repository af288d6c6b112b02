//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: url, route, outcome)
//!     → one `navigate` span per navigation, keyed by a UUID
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → logging.rs installs a fmt subscriber for the CLI
//!     → embedders install their own subscriber / metrics recorder
//! ```

pub mod logging;
pub mod metrics;
