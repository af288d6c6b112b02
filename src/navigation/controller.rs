//! The navigation pipeline.
//!
//! # Data Flow
//! ```text
//! navigate(target)
//!     → resolve against location (equal → Unchanged)
//!     → beforeEach hooks (Abort / Redirect / failure)
//!     → route match
//!         loader / renderer / template      (loading marker on container)
//!         pass-through or unmatched         → content cache → transport
//!     → generation check (stale → Superseded)
//!     → reconcile container → activate scripts
//!     → generation check (stale → Superseded)
//!     → history push/replace, title, location, active links, scroll
//!     → afterEach hooks
//! failure after beforeEach → onError hooks → Window::hard_navigate
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::cache::{CacheEntry, ContentCache, LoaderCache};
use crate::config::{validate_config, ConfigError, NavigatorConfig, ValidationError};
use crate::dom::{extract_page, NodeId, Selector, SharedSurface};
use crate::host::{HistoryEntry, Host};
use crate::navigation::context::{NavigateOptions, NavigationContext, NavigationOutcome};
use crate::navigation::error::{NavigationError, NavigationResult};
use crate::navigation::hooks::{HookDecision, HookRegistry};
use crate::observability::metrics;
use crate::reconcile::{self, activate_scripts};
use crate::routing::{
    Loader, MatchResult, Renderer, RouteContext, RouteError, RouteKind, RouteTable,
};
use crate::transport::TransportRequest;

/// Maximum number of `beforeEach` redirects followed by one navigation.
pub const MAX_REDIRECTS: usize = 10;

/// Attribute marking the container while a route pipeline runs.
pub const LOADING_ATTR: &str = "aria-busy";

/// Attribute marking links that point at the current location.
pub const ACTIVE_ATTR: &str = "aria-current";

/// Configured selectors, parsed once per config.
#[derive(Debug, Clone)]
pub(crate) struct Selectors {
    pub container: Selector,
    pub link: Selector,
    pub form: Selector,
}

impl Selectors {
    fn from_config(config: &NavigatorConfig) -> Result<Self, ConfigError> {
        let parse = |field: &'static str, source: &str| {
            Selector::parse(source).map_err(|e| {
                ConfigError::Validation(vec![ValidationError::Selector {
                    field,
                    selector: e.selector,
                    reason: e.reason,
                }])
            })
        };
        Ok(Self {
            container: parse("container", &config.container)?,
            link: parse("link_selector", &config.link_selector)?,
            form: parse("form_selector", &config.form_selector)?,
        })
    }
}

/// Markup ready to commit.
#[derive(Debug, Clone)]
pub(crate) struct Page {
    pub html: String,
    /// `None` keeps the current title.
    pub title: Option<String>,
}

impl From<CacheEntry> for Page {
    fn from(entry: CacheEntry) -> Self {
        let title = Some(entry.title).filter(|t| !t.is_empty());
        Self {
            html: entry.html,
            title,
        }
    }
}

/// Client-side navigator bound to one host.
pub struct Navigator {
    config: ArcSwap<NavigatorConfig>,
    selectors: ArcSwap<Selectors>,
    routes: RwLock<RouteTable>,
    content_cache: ContentCache,
    loader_cache: LoaderCache,
    hooks: HookRegistry,
    pub(crate) host: Host,
    location: ArcSwap<Url>,
    title: Mutex<String>,
    generation: AtomicU64,
    /// Held while checking the generation and writing what it guards.
    writes: Mutex<()>,
    /// Generation owning the loading marker, 0 when unset.
    loading_owner: AtomicU64,
}

impl Navigator {
    /// Create a navigator for a host currently showing `location`.
    pub fn new(config: NavigatorConfig, host: Host, location: Url) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let selectors = Selectors::from_config(&config)?;
        let routes = RouteTable::from_config(&config.routes)?;
        metrics::set_enabled(config.observability.metrics_enabled);

        let title = {
            let surface = host.surface.lock();
            Selector::parse("title")
                .ok()
                .and_then(|sel| surface.query(&sel))
                .map(|node| surface.text_content(node).trim().to_string())
                .unwrap_or_default()
        };

        tracing::info!(
            location = %location,
            container = %config.container,
            routes = routes.len(),
            "Navigator initialized"
        );

        let navigator = Self {
            config: ArcSwap::from_pointee(config),
            selectors: ArcSwap::from_pointee(selectors),
            routes: RwLock::new(routes),
            content_cache: ContentCache::new(),
            loader_cache: LoaderCache::new(),
            hooks: HookRegistry::new(),
            host,
            location: ArcSwap::from_pointee(location),
            title: Mutex::new(title),
            generation: AtomicU64::new(0),
            writes: Mutex::new(()),
            loading_owner: AtomicU64::new(0),
        };
        navigator.refresh_active_links();
        Ok(navigator)
    }

    pub fn config(&self) -> Arc<NavigatorConfig> {
        self.config.load_full()
    }

    pub(crate) fn selectors(&self) -> Arc<Selectors> {
        self.selectors.load_full()
    }

    /// Atomically replace the configuration. Routes declared in the new
    /// config are not re-registered; the route table only grows through
    /// [`Navigator::route`].
    pub fn update_config(&self, config: NavigatorConfig) -> Result<(), ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let selectors = Selectors::from_config(&config)?;
        metrics::set_enabled(config.observability.metrics_enabled);
        self.selectors.store(Arc::new(selectors));
        self.config.store(Arc::new(config));
        tracing::info!("Navigator configuration updated");
        Ok(())
    }

    /// Register a route after any already registered.
    pub fn route(&self, pattern: &str, kind: RouteKind) -> Result<(), RouteError> {
        self.routes.write().register(pattern, kind)
    }

    pub fn match_route(&self, url: &Url) -> Option<MatchResult> {
        self.routes.read().match_url(url)
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn content_cache(&self) -> &ContentCache {
        &self.content_cache
    }

    pub fn loader_cache(&self) -> &LoaderCache {
        &self.loader_cache
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.host.surface
    }

    /// Current location.
    pub fn location(&self) -> Url {
        (**self.location.load()).clone()
    }

    pub fn title(&self) -> String {
        self.title.lock().clone()
    }

    /// Resolve a target against the current location.
    pub fn resolve(&self, target: &str) -> Option<Url> {
        self.location.load().join(target).ok()
    }

    pub(crate) fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.location.load().origin()
    }

    /// Navigate to `target`, resolved against the current location.
    pub async fn navigate(&self, target: &str, options: NavigateOptions) -> NavigationOutcome {
        let outcome = self.navigate_with_hooks(target, options).await;
        metrics::record_navigation(outcome.label());
        outcome
    }

    async fn navigate_with_hooks(
        &self,
        target: &str,
        options: NavigateOptions,
    ) -> NavigationOutcome {
        let mut target = target.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let Some(url) = self.resolve(&target) else {
                tracing::debug!(target = %target, "Ignoring unresolvable target");
                return NavigationOutcome::Ignored;
            };
            if url == **self.location.load() {
                return NavigationOutcome::Unchanged;
            }

            let ctx = NavigationContext::new(&url);
            match self.hooks.run_before(&ctx).await {
                Ok(HookDecision::Continue) => return self.perform(url, ctx, options).await,
                Ok(HookDecision::Abort) => {
                    tracing::debug!(url = %url, "Navigation aborted by beforeEach hook");
                    return NavigationOutcome::Aborted;
                }
                Ok(HookDecision::Redirect(next)) => {
                    tracing::debug!(
                        from = %url,
                        to = %next,
                        "Navigation redirected by beforeEach hook"
                    );
                    target = next;
                }
                Err(e) => {
                    self.hooks.dispatch_error(e, Some(&ctx)).await;
                    return NavigationOutcome::Aborted;
                }
            }
        }

        self.hooks
            .dispatch_error(NavigationError::TooManyRedirects(MAX_REDIRECTS), None)
            .await;
        NavigationOutcome::Aborted
    }

    /// Steps after `beforeEach`: render, commit, scroll, `afterEach`.
    async fn perform(
        &self,
        url: Url,
        ctx: NavigationContext,
        options: NavigateOptions,
    ) -> NavigationOutcome {
        let generation = self.begin();
        let span = tracing::info_span!("navigation", id = %Uuid::new_v4(), url = %url);

        async move {
            let committed = match self.render(&url, generation).await {
                Ok(page) => self.commit(&url, page, options.replace, generation).await,
                Err(e) => Err(e),
            };
            match committed {
                Ok(outcome @ NavigationOutcome::Rendered { .. }) => {
                    if let Some(top) = options.scroll_top {
                        self.host.window.scroll_to(top);
                    }
                    self.hooks.run_after(&ctx).await;
                    tracing::info!("Navigation committed");
                    outcome
                }
                Ok(outcome) => outcome,
                Err(e) => self.fail(e, Some(&ctx), &url, generation).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Start a navigation, superseding any in flight.
    pub(crate) fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Report `error` and fall back to a conventional load of `url`, unless
    /// a newer navigation has taken over.
    pub(crate) async fn fail(
        &self,
        error: NavigationError,
        ctx: Option<&NavigationContext>,
        url: &Url,
        generation: u64,
    ) -> NavigationOutcome {
        self.hooks.dispatch_error(error, ctx).await;
        if !self.is_current(generation) {
            return NavigationOutcome::Superseded;
        }
        tracing::warn!(url = %url, "Falling back to full navigation");
        metrics::record_fallback();
        self.host.window.hard_navigate(url.as_str());
        NavigationOutcome::Fallback {
            url: url.to_string(),
        }
    }

    async fn render(&self, url: &Url, generation: u64) -> NavigationResult<Page> {
        let matched = self.match_route(url);
        match matched {
            Some(m) if m.route.kind.has_pipeline() => {
                let _loading = LoadingGuard::set(self, generation);
                self.run_route(&m).await
            }
            _ => self.fetch_page(url).await,
        }
    }

    async fn run_route(&self, matched: &MatchResult) -> NavigationResult<Page> {
        let ctx = matched.context();
        match &matched.route.kind {
            RouteKind::Loader { loader, renderer } => {
                let data = self.load(loader.as_ref(), &ctx).await?;
                match renderer {
                    Some(renderer) => self.render_with(renderer.as_ref(), Some(&data), &ctx).await,
                    None => self.fetch_page(&matched.url).await,
                }
            }
            RouteKind::Render(renderer) => {
                let data = self.loader_cache.get(matched.url.as_str());
                self.render_with(renderer.as_ref(), data.as_ref(), &ctx).await
            }
            RouteKind::Template(template) => Ok(Page {
                html: template.clone(),
                title: None,
            }),
            RouteKind::PassThrough => self.fetch_page(&matched.url).await,
        }
    }

    /// Run a loader once per URL.
    pub(crate) async fn load(
        &self,
        loader: &dyn Loader,
        ctx: &RouteContext,
    ) -> NavigationResult<serde_json::Value> {
        let key = ctx.url.as_str();
        if let Some(hit) = self.loader_cache.get(key) {
            return Ok(hit);
        }
        let data = loader.load(ctx).await.map_err(|source| NavigationError::Loader {
            url: key.to_string(),
            source,
        })?;
        self.loader_cache.insert(key, data.clone());
        Ok(data)
    }

    pub(crate) async fn render_with(
        &self,
        renderer: &dyn Renderer,
        data: Option<&serde_json::Value>,
        ctx: &RouteContext,
    ) -> NavigationResult<Page> {
        let html = renderer
            .render(data, ctx)
            .await
            .map_err(|source| NavigationError::Renderer {
                url: ctx.url.to_string(),
                source,
            })?;
        Ok(Page { html, title: None })
    }

    /// Cached content, or fetch-and-extract.
    async fn fetch_page(&self, url: &Url) -> NavigationResult<Page> {
        let config = self.config();
        if config.cache {
            if let Some(hit) = self.content_cache.get(url.as_str()) {
                tracing::debug!(url = %url, "Content cache hit");
                return Ok(hit.into());
            }
        }
        let entry = self.fetch_entry(url).await?;
        if config.cache {
            self.content_cache.insert(url.as_str(), entry.clone());
        }
        Ok(entry.into())
    }

    pub(crate) async fn fetch_entry(&self, url: &Url) -> NavigationResult<CacheEntry> {
        let config = self.config();
        let request = TransportRequest::get(url.as_str())
            .header(&config.request_header.name, &config.request_header.value);
        let response = self.host.transport.fetch(request).await?;
        if !response.is_success() {
            return Err(NavigationError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(extract_page(&response.body, &config.container))
    }

    /// Patch the container, activate scripts and record the new state.
    ///
    /// Returns `Superseded` without touching history or location when a
    /// newer navigation started before the patch or while scripts ran.
    pub(crate) async fn commit(
        &self,
        url: &Url,
        page: Page,
        replace: bool,
        generation: u64,
    ) -> NavigationResult<NavigationOutcome> {
        let Some(container) = self.patch_container(&page.html, generation).await? else {
            tracing::debug!("Superseded before patching");
            return Ok(NavigationOutcome::Superseded);
        };

        let _writes = self.writes.lock();
        if !self.is_current(generation) {
            tracing::debug!("Superseded while activating scripts");
            return Ok(NavigationOutcome::Superseded);
        }
        self.record(url, container, page.title, replace);
        Ok(NavigationOutcome::Rendered {
            url: url.to_string(),
        })
    }

    /// Patch the container toward `html` and activate introduced scripts.
    /// `None` when `generation` is no longer current.
    async fn patch_container(
        &self,
        html: &str,
        generation: u64,
    ) -> NavigationResult<Option<NodeId>> {
        let (container, report) = {
            let _writes = self.writes.lock();
            if !self.is_current(generation) {
                return Ok(None);
            }
            let mut surface = self.host.surface.lock();
            let container = surface
                .query(&self.selectors().container)
                .ok_or_else(|| NavigationError::MissingContainer(self.config().container.clone()))?;
            (container, reconcile::patch(&mut *surface, container, html))
        };
        let scripts = self.host.scripts.as_ref();
        let ran = activate_scripts(&self.host.surface, scripts, &report.scripts).await;
        tracing::debug!(mutations = report.mutations, scripts = ran, "Container patched");
        Ok(Some(container))
    }

    /// Snapshot into history, then update title, location and active links.
    fn record(&self, url: &Url, container: NodeId, title: Option<String>, replace: bool) {
        let title = title.unwrap_or_else(|| self.title());
        let entry = HistoryEntry {
            html: self.host.surface.lock().inner_html(container),
            title: title.clone(),
            url: url.to_string(),
        };
        if replace {
            self.host.history.replace(entry);
        } else {
            self.host.history.push(entry);
        }
        self.set_location(url, title);
    }

    fn set_location(&self, url: &Url, title: String) {
        self.host.window.set_title(&title);
        *self.title.lock() = title;
        self.location.store(Arc::new(url.clone()));
        self.refresh_active_links();
    }

    /// Restore a history entry or, without one, re-navigate in place.
    pub async fn on_history_popped(
        &self,
        url: &str,
        state: Option<HistoryEntry>,
    ) -> NavigationOutcome {
        let Some(entry) = state else {
            return self.navigate(url, NavigateOptions::replace()).await;
        };
        let Some(target) = self.resolve(url) else {
            return NavigationOutcome::Ignored;
        };

        let generation = self.begin();
        match self.patch_container(&entry.html, generation).await {
            Ok(Some(_)) => {
                let _writes = self.writes.lock();
                if !self.is_current(generation) {
                    return NavigationOutcome::Superseded;
                }
                tracing::debug!(url = %target, "Restored history snapshot");
                self.set_location(&target, entry.title);
                metrics::record_navigation("restored");
                NavigationOutcome::Rendered {
                    url: target.to_string(),
                }
            }
            Ok(None) => NavigationOutcome::Superseded,
            Err(e) => self.fail(e, None, &target, generation).await,
        }
    }

    /// Mark links resolving to the current location with `aria-current`.
    fn refresh_active_links(&self) {
        let config = self.config();
        let selectors = self.selectors();
        let current = self.location();
        let mut surface = self.host.surface.lock();

        for link in surface.query_all(&selectors.link) {
            let active = surface
                .attribute(link, &config.link_attr_name)
                .and_then(|href| current.join(&href).ok())
                .is_some_and(|target| target == current);
            let marked = surface.attribute(link, ACTIVE_ATTR).is_some();
            if active && !marked {
                surface.set_attribute(link, ACTIVE_ATTR, "page");
            } else if !active && marked {
                surface.remove_attribute(link, ACTIVE_ATTR);
            }
        }
    }
}

/// Marks the container as loading until dropped.
///
/// A newer navigation that sets the marker takes it over; the older guard
/// then leaves it for the new owner to clear.
struct LoadingGuard<'a> {
    surface: &'a SharedSurface,
    owner: &'a AtomicU64,
    generation: u64,
    container: Option<NodeId>,
}

impl<'a> LoadingGuard<'a> {
    fn set(navigator: &'a Navigator, generation: u64) -> Self {
        let surface = &navigator.host.surface;
        let container = {
            let mut locked = surface.lock();
            let node = locked.query(&navigator.selectors().container);
            if let Some(node) = node {
                locked.set_attribute(node, LOADING_ATTR, "true");
                navigator.loading_owner.store(generation, Ordering::SeqCst);
            }
            node
        };
        Self {
            surface,
            owner: &navigator.loading_owner,
            generation,
            container,
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let Some(node) = self.container else {
            return;
        };
        let mut surface = self.surface.lock();
        let released = self
            .owner
            .compare_exchange(self.generation, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if released {
            surface.remove_attribute(node, LOADING_ATTR);
        }
    }
}
