//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the navigator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the navigator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Selector for the render root that navigations patch.
    pub container: String,

    /// Selector for links whose activation is intercepted.
    pub link_selector: String,

    /// Attribute holding a link's target URL.
    pub link_attr_name: String,

    /// Selector for forms whose submission is intercepted.
    pub form_selector: String,

    /// Enable the rendered-content cache.
    pub cache: bool,

    /// Speculatively load hovered links.
    pub prefetch_on_hover: bool,

    /// Header sent with every in-app request.
    pub request_header: RequestHeaderConfig,

    /// Transport timeout in seconds (HTTP transport only).
    pub request_timeout_secs: u64,

    /// Routes declared in configuration.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            container: "#app".to_string(),
            link_selector: "a[href]".to_string(),
            link_attr_name: "href".to_string(),
            form_selector: "form".to_string(),
            cache: true,
            prefetch_on_hover: true,
            request_header: RequestHeaderConfig::default(),
            request_timeout_secs: 30,
            routes: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Header identifying in-app requests to cooperating servers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestHeaderConfig {
    pub name: String,
    pub value: String,
}

impl Default for RequestHeaderConfig {
    fn default() -> Self {
        Self {
            name: "X-Requested-With".to_string(),
            value: "spa-navigator".to_string(),
        }
    }
}

/// A route declared in configuration.
///
/// Routes with a template render it verbatim; routes without one are
/// pass-through and fetch the page from the server. Loader-backed routes can
/// only be registered in code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path pattern, e.g. `/user/:id` or `/docs/*`.
    pub pattern: String,

    /// Static markup for the route.
    #[serde(default)]
    pub template: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Record navigation counters through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "spa_navigator=info".to_string(),
            metrics_enabled: true,
        }
    }
}
