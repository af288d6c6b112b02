//! Navigation subsystem.
//!
//! # Data Flow
//! ```text
//! host gesture ──→ gestures.rs (link eligibility) ──┐
//! host submit  ──→ forms.rs (GET → navigate) ───────┤
//! host popstate ─→ controller.rs (snapshot restore) │
//!                                                   ▼
//!                     controller.rs: hooks → route → render → commit
//!                                                   ▲
//! host hover ───→ prefetch.rs (detached task, warms caches only)
//! ```
//!
//! # Design Decisions
//! - One `Navigator` per host; capabilities are injected through `Host`
//! - Overlapping navigations supersede each other: only the newest one may
//!   write to the surface or history
//! - Any failure after `beforeEach` ends in `onError` and a conventional
//!   load of the target

pub mod context;
pub mod controller;
pub mod error;
pub mod forms;
pub mod gestures;
pub mod hooks;
pub mod prefetch;

pub use context::{NavigateOptions, NavigationContext, NavigationOutcome};
pub use controller::{Navigator, ACTIVE_ATTR, LOADING_ATTR, MAX_REDIRECTS};
pub use error::NavigationError;
pub use forms::serialize_form;
pub use gestures::{Gesture, Modifiers};
pub use hooks::{ErrorEvent, HookDecision, HookRegistry};
