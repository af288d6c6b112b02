//! Host capabilities other than the render surface and transport.
//!
//! # Responsibilities
//! - `HistoryStore`: push/replace structural snapshots
//! - `Window`: title, scroll position, conventional full navigation
//! - `ScriptRunner`: execute inline scripts and load external ones
//!
//! # Design Decisions
//! - Capabilities are injected trait objects, so several navigators can run
//!   side by side (tests do this constantly)
//! - `headless.rs` provides recording implementations for the CLI and tests

pub mod headless;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dom::SharedSurface;
use crate::transport::Transport;

pub use headless::{HeadlessWindow, MemoryHistory, RecordingScripts, ScriptRun};

/// Every capability a navigator needs from its host.
#[derive(Clone)]
pub struct Host {
    pub surface: SharedSurface,
    pub transport: Arc<dyn Transport>,
    pub history: Arc<dyn HistoryStore>,
    pub window: Arc<dyn Window>,
    pub scripts: Arc<dyn ScriptRunner>,
}

/// Snapshot stored with a history entry, enough to restore the container
/// without refetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub html: String,
    pub title: String,
    pub url: String,
}

/// Browser-style session history.
pub trait HistoryStore: Send + Sync {
    fn push(&self, entry: HistoryEntry);
    fn replace(&self, entry: HistoryEntry);
}

/// Window-level side effects.
pub trait Window: Send + Sync {
    fn set_title(&self, title: &str);

    fn scroll_to(&self, top: u32);

    /// Abandon in-app navigation and load `url` conventionally.
    fn hard_navigate(&self, url: &str);
}

/// Executes script fragments introduced into the surface.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn execute_inline(&self, code: &str) -> anyhow::Result<()>;

    /// Resolves once the script at `src` has loaded and run.
    async fn load_external(&self, src: &str) -> anyhow::Result<()>;
}
