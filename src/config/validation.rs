//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check selectors parse with scraper's selector grammar
//! - Check route patterns compile
//! - Validate value ranges (timeouts > 0, non-empty names)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NavigatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::NavigatorConfig;
use crate::routing::pattern::CompiledPattern;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is not a valid selector: '{selector}' ({reason})")]
    Selector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("route '{pattern}' is invalid: {reason}")]
    Route { pattern: String, reason: String },

    #[error("request_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &NavigatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let selectors = [
        ("container", &config.container),
        ("link_selector", &config.link_selector),
        ("form_selector", &config.form_selector),
    ];
    for (field, selector) in selectors {
        if selector.trim().is_empty() {
            errors.push(ValidationError::Empty(field));
        } else if let Err(e) = scraper::Selector::parse(selector) {
            errors.push(ValidationError::Selector {
                field,
                selector: selector.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config.link_attr_name.trim().is_empty() {
        errors.push(ValidationError::Empty("link_attr_name"));
    }
    if config.request_header.name.trim().is_empty() {
        errors.push(ValidationError::Empty("request_header.name"));
    }
    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for route in &config.routes {
        if let Err(e) = CompiledPattern::compile(&route.pattern) {
            errors.push(ValidationError::Route {
                pattern: route.pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
