//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route matching a URL's path
//! - Decode params and query into a `MatchResult`
//!
//! # Design Decisions
//! - First match wins; no specificity sorting
//! - O(n) scan (route tables are tens of entries, not thousands)
//! - Explicit `None` on no-match; unparsable URLs are simply no-match

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::RouteConfig;
use crate::routing::pattern::{CompiledPattern, RouteError};
use crate::routing::query::{decode_param, parse_query};

/// The decomposed URL handed to loaders and renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    pub url: Url,
    pub pathname: String,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

/// Produces the data a route renders.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, ctx: &RouteContext) -> anyhow::Result<Value>;
}

/// Turns loader data into markup.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, data: Option<&Value>, ctx: &RouteContext) -> anyhow::Result<String>;
}

/// Adapter implementing [`Loader`] for an async closure.
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(RouteContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn load(&self, ctx: &RouteContext) -> anyhow::Result<Value> {
        (self.0)(ctx.clone()).await
    }
}

/// Adapter implementing [`Renderer`] for an async closure.
pub struct RendererFn<F>(pub F);

#[async_trait]
impl<F, Fut> Renderer for RendererFn<F>
where
    F: Fn(Option<Value>, RouteContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send,
{
    async fn render(&self, data: Option<&Value>, ctx: &RouteContext) -> anyhow::Result<String> {
        (self.0)(data.cloned(), ctx.clone()).await
    }
}

/// What a matched route does.
#[derive(Clone)]
pub enum RouteKind {
    /// Run the loader (memoized per URL), then render its data. Without a
    /// renderer the page is fetched as for a pass-through route.
    Loader {
        loader: Arc<dyn Loader>,
        renderer: Option<Arc<dyn Renderer>>,
    },
    /// Render without loader data.
    Render(Arc<dyn Renderer>),
    /// Static markup used verbatim.
    Template(String),
    /// Inert: fetch the page from the server.
    PassThrough,
}

impl RouteKind {
    pub fn loader(loader: impl Loader + 'static, renderer: impl Renderer + 'static) -> Self {
        RouteKind::Loader {
            loader: Arc::new(loader),
            renderer: Some(Arc::new(renderer)),
        }
    }

    /// Whether matching this route runs an in-app render pipeline.
    pub fn has_pipeline(&self) -> bool {
        !matches!(self, RouteKind::PassThrough)
    }

    fn label(&self) -> &'static str {
        match self {
            RouteKind::Loader { .. } => "loader",
            RouteKind::Render(_) => "render",
            RouteKind::Template(_) => "template",
            RouteKind::PassThrough => "pass-through",
        }
    }
}

impl fmt::Debug for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A registered route.
#[derive(Debug)]
pub struct RouteEntry {
    pub pattern: CompiledPattern,
    pub kind: RouteKind,
}

/// Result of matching a URL against the table.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub route: Arc<RouteEntry>,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub pathname: String,
    pub url: Url,
}

impl MatchResult {
    pub fn context(&self) -> RouteContext {
        RouteContext {
            url: self.url.clone(),
            pathname: self.pathname.clone(),
            params: self.params.clone(),
            query: self.query.clone(),
        }
    }
}

/// Ordered route table.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from configured routes, preserving their order.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for config in configs {
            let kind = match &config.template {
                Some(template) => RouteKind::Template(template.clone()),
                None => RouteKind::PassThrough,
            };
            table.register(&config.pattern, kind)?;
        }
        Ok(table)
    }

    /// Compile and append a route. Registration order is match priority.
    pub fn register(&mut self, pattern: &str, kind: RouteKind) -> Result<(), RouteError> {
        let pattern = CompiledPattern::compile(pattern)?;
        tracing::debug!(pattern = %pattern.source(), kind = ?kind, "Route registered");
        self.routes.push(Arc::new(RouteEntry { pattern, kind }));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.routes.iter()
    }

    /// Find the first route whose pattern matches the URL's path.
    pub fn match_url(&self, url: &Url) -> Option<MatchResult> {
        let path = url.path();
        self.routes.iter().find_map(|route| {
            let captures = route.pattern.captures(path)?;
            let params = captures
                .into_iter()
                .map(|(name, raw)| (name.to_string(), decode_param(raw)))
                .collect();
            Some(MatchResult {
                route: route.clone(),
                params,
                query: parse_query(url.query().unwrap_or_default()),
                pathname: path.to_string(),
                url: url.clone(),
            })
        })
    }

    /// Match an absolute URL string; malformed URLs never match.
    pub fn match_str(&self, url: &str) -> Option<MatchResult> {
        Url::parse(url).ok().and_then(|u| self.match_url(&u))
    }
}
