//! URL-keyed content caches.
//!
//! # Data Flow
//! ```text
//! fetch-and-extract / prefetch
//!     → ContentCache.insert(absolute URL, {html, title})
//! loader run / prefetch
//!     → LoaderCache.insert(absolute URL, data)
//! next visit of the same URL
//!     → cache hit, no transport or loader call
//! ```
//!
//! # Design Decisions
//! - Keys are the fully resolved absolute URL string
//! - Entries are never invalidated automatically; content is a function of
//!   its URL for the life of a session. `clear()` ends a session.
//! - DashMap so prefetch tasks can write while a navigation reads

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::observability::metrics;

/// Rendered page content extracted from a fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Inner HTML of the container.
    pub html: String,
    /// Document title, empty when the page has none.
    pub title: String,
}

/// Cache of rendered page content.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let hit = self.inner.get(url).map(|r| r.value().clone());
        metrics::record_cache_lookup("content", hit.is_some());
        hit
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains_key(url)
    }

    pub fn insert(&self, url: impl Into<String>, entry: CacheEntry) {
        self.inner.insert(url.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

/// Cache of raw loader results.
#[derive(Debug, Clone, Default)]
pub struct LoaderCache {
    inner: Arc<DashMap<String, Value>>,
}

impl LoaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Value> {
        let hit = self.inner.get(url).map(|r| r.value().clone());
        metrics::record_cache_lookup("loader", hit.is_some());
        hit
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains_key(url)
    }

    pub fn insert(&self, url: impl Into<String>, data: Value) {
        self.inner.insert(url.into(), data);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Keys currently cached, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}
