//! Client-side navigation for server-rendered pages.
//!
//! Intercepts link and form gestures, renders the target through a route
//! table (loader + renderer, static template, or fetch-and-extract), patches
//! the live render surface in place and keeps history, title and scroll in
//! step. Hosts plug in through the `Surface`, `Transport`, `HistoryStore`,
//! `Window` and `ScriptRunner` capabilities.

pub mod cache;
pub mod config;
pub mod dom;
pub mod host;
pub mod navigation;
pub mod observability;
pub mod reconcile;
pub mod routing;
pub mod transport;

pub use config::NavigatorConfig;
pub use host::Host;
pub use navigation::{NavigateOptions, NavigationOutcome, Navigator};
pub use routing::{LoaderFn, RendererFn, RouteKind};
