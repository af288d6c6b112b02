//! Hover prefetch.

use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use crate::navigation::controller::Navigator;
use crate::navigation::gestures::Gesture;
use crate::observability::metrics;
use crate::routing::RouteKind;

impl Navigator {
    /// Warm the caches for the link under a hover gesture.
    ///
    /// Returns the handle of the spawned task, or `None` when nothing was
    /// started. Failures are logged and never surface to a navigation.
    pub fn on_link_hovered(self: &Arc<Self>, gesture: &Gesture) -> Option<JoinHandle<()>> {
        if !self.config().prefetch_on_hover {
            return None;
        }
        let url = self.eligible_link(gesture.target)?;
        let key = url.as_str();
        if url == self.location()
            || self.content_cache().contains(key)
            || self.loader_cache().contains(key)
        {
            return None;
        }

        let navigator = Arc::clone(self);
        Some(tokio::spawn(async move { navigator.prefetch(url).await }))
    }

    async fn prefetch(&self, url: Url) {
        let matched = self.match_route(&url);
        match matched.as_ref().map(|m| (&m.route.kind, m.context())) {
            Some((RouteKind::Loader { loader, .. }, ctx)) => {
                match self.load(loader.as_ref(), &ctx).await {
                    Ok(_) => metrics::record_prefetch("loader", true),
                    Err(e) => {
                        tracing::debug!(url = %url, error = %e, "Prefetch loader failed");
                        metrics::record_prefetch("loader", false);
                    }
                }
            }
            // Nothing to warm: the markup is produced locally.
            Some((RouteKind::Render(_) | RouteKind::Template(_), _)) => {}
            _ => {
                if !self.config().cache {
                    return;
                }
                match self.fetch_entry(&url).await {
                    Ok(entry) => {
                        self.content_cache().insert(url.as_str(), entry);
                        metrics::record_prefetch("page", true);
                    }
                    Err(e) => {
                        tracing::debug!(url = %url, error = %e, "Prefetch fetch failed");
                        metrics::record_prefetch("page", false);
                    }
                }
            }
        }
    }
}
