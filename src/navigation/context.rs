//! Values passed to hooks and returned from navigation entry points.

use std::collections::HashMap;

use serde_json::Value;
use url::Url;

use crate::routing::parse_query;

/// Snapshot of a navigation target handed to every hook.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationContext {
    pub url: Url,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Full URL string, fragment included.
    pub full: String,
}

impl NavigationContext {
    pub fn new(url: &Url) -> Self {
        Self {
            url: url.clone(),
            path: url.path().to_string(),
            query: url.query().map(parse_query).unwrap_or_default(),
            full: url.to_string(),
        }
    }
}

/// Per-call navigation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    /// Scroll position applied after commit; `None` leaves scroll alone.
    pub scroll_top: Option<u32>,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            replace: false,
            scroll_top: Some(0),
        }
    }
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self {
            replace: true,
            ..Self::default()
        }
    }

    pub fn without_scroll(mut self) -> Self {
        self.scroll_top = None;
        self
    }
}

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// New content is on the surface and `url` is the current location.
    Rendered { url: String },
    /// Target equals the current location.
    Unchanged,
    /// A `beforeEach` hook vetoed or failed.
    Aborted,
    /// The gesture or target is not handled in-app.
    Ignored,
    /// The pipeline failed and the host was asked to load `url` conventionally.
    Fallback { url: String },
    /// A newer navigation started before this one could commit.
    Superseded,
    /// A form submission answered with JSON that no route renders.
    Data(Value),
}

impl NavigationOutcome {
    /// Stable label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rendered { .. } => "rendered",
            Self::Unchanged => "unchanged",
            Self::Aborted => "aborted",
            Self::Ignored => "ignored",
            Self::Fallback { .. } => "fallback",
            Self::Superseded => "superseded",
            Self::Data(_) => "data",
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}
