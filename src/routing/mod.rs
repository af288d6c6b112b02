//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     pattern string
//!     → pattern.rs (escape literals, compile :params and * to regex)
//!     → router.rs (append to ordered RouteTable)
//!
//! Navigation:
//!     absolute URL
//!     → router.rs (scan in registration order, path only)
//!     → query.rs (decode params and query)
//!     → MatchResult or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable afterwards
//! - First match wins (registration order)
//! - Matching is anchored and case-sensitive
//! - Decode failures fall back to raw captures instead of failing the match

pub mod pattern;
pub mod query;
pub mod router;

pub use pattern::{CompiledPattern, RouteError, WILDCARD_PARAM};
pub use query::parse_query;
pub use router::{
    Loader, LoaderFn, MatchResult, Renderer, RendererFn, RouteContext, RouteEntry, RouteKind,
    RouteTable,
};
