//! Navigation error definitions.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors routed through the `onError` hooks.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// A `beforeEach` hook failed; the navigation is aborted.
    #[error("beforeEach hook failed: {0}")]
    BeforeHook(anyhow::Error),

    /// An `afterEach` hook failed; remaining hooks still run.
    #[error("afterEach hook failed: {0}")]
    AfterHook(anyhow::Error),

    #[error("loader for {url} failed: {source}")]
    Loader { url: String, source: anyhow::Error },

    #[error("renderer for {url} failed: {source}")]
    Renderer { url: String, source: anyhow::Error },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned malformed JSON: {source}")]
    InvalidJson {
        url: String,
        source: serde_json::Error,
    },

    #[error("container '{0}' not found in the render surface")]
    MissingContainer(String),

    #[error("gave up after {0} beforeEach redirects")]
    TooManyRedirects(usize),
}

/// Result type for navigation pipeline steps.
pub type NavigationResult<T> = Result<T, NavigationError>;
