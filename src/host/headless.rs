//! Headless host implementations.
//!
//! They record what a browser would have done so the CLI can report it and
//! tests can assert on it.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::host::{HistoryEntry, HistoryStore, ScriptRunner, Window};

/// In-memory session history with a cursor, like a browser tab.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    inner: Mutex<HistoryState>,
}

#[derive(Debug, Default)]
struct HistoryState {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current(&self) -> Option<HistoryEntry> {
        let state = self.inner.lock();
        state.entries.get(state.index).cloned()
    }

    /// Move the cursor back, returning the entry a pop event would carry.
    pub fn back(&self) -> Option<HistoryEntry> {
        let mut state = self.inner.lock();
        if state.index == 0 || state.entries.is_empty() {
            return None;
        }
        state.index -= 1;
        state.entries.get(state.index).cloned()
    }

    pub fn forward(&self) -> Option<HistoryEntry> {
        let mut state = self.inner.lock();
        if state.index + 1 >= state.entries.len() {
            return None;
        }
        state.index += 1;
        state.entries.get(state.index).cloned()
    }
}

impl HistoryStore for MemoryHistory {
    fn push(&self, entry: HistoryEntry) {
        let mut state = self.inner.lock();
        if !state.entries.is_empty() {
            let keep = state.index + 1;
            state.entries.truncate(keep);
        }
        state.entries.push(entry);
        state.index = state.entries.len() - 1;
    }

    fn replace(&self, entry: HistoryEntry) {
        let mut state = self.inner.lock();
        let index = state.index;
        match state.entries.get_mut(index) {
            Some(slot) => *slot = entry,
            None => state.entries.push(entry),
        }
    }
}

/// Window that records titles, scrolls and hard navigations.
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    title: Mutex<String>,
    scrolls: Mutex<Vec<u32>>,
    hard_navigations: Mutex<Vec<String>>,
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    pub fn scrolls(&self) -> Vec<u32> {
        self.scrolls.lock().clone()
    }

    pub fn hard_navigations(&self) -> Vec<String> {
        self.hard_navigations.lock().clone()
    }
}

impl Window for HeadlessWindow {
    fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }

    fn scroll_to(&self, top: u32) {
        self.scrolls.lock().push(top);
    }

    fn hard_navigate(&self, url: &str) {
        tracing::info!(url = %url, "Full page navigation");
        self.hard_navigations.lock().push(url.to_string());
    }
}

/// A script activation seen by [`RecordingScripts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRun {
    Inline(String),
    External(String),
}

/// Script runner that records activations instead of executing them.
#[derive(Debug, Default)]
pub struct RecordingScripts {
    runs: Mutex<Vec<ScriptRun>>,
}

impl RecordingScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<ScriptRun> {
        self.runs.lock().clone()
    }
}

#[async_trait]
impl ScriptRunner for RecordingScripts {
    async fn execute_inline(&self, code: &str) -> anyhow::Result<()> {
        tracing::debug!(bytes = code.len(), "Inline script recorded");
        self.runs.lock().push(ScriptRun::Inline(code.to_string()));
        Ok(())
    }

    async fn load_external(&self, src: &str) -> anyhow::Result<()> {
        tracing::debug!(src = %src, "External script recorded");
        self.runs.lock().push(ScriptRun::External(src.to_string()));
        Ok(())
    }
}
