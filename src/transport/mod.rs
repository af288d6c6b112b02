//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Navigator (fetch fallback, forms, prefetch)
//!     → TransportRequest { method, url, headers, body }
//!     → Transport::fetch (http.rs: reqwest)
//!     → TransportResponse { status, content_type, body, url }
//! ```
//!
//! # Design Decisions
//! - Status codes are returned, not turned into errors; the navigator
//!   decides what counts as failure
//! - Every in-app request carries the configured identifying header
//! - No retries: a failed fetch triggers the hard fallback instead

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpTransport;

/// Errors raised by a transport before a response is available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A request issued by the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A response as seen by the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Final URL after redirects.
    pub url: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

/// HTTP-capable fetch.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
