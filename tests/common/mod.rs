//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use url::Url;

use spa_navigator::config::NavigatorConfig;
use spa_navigator::dom::{MemoryDom, NodeId, Selector};
use spa_navigator::host::{HeadlessWindow, Host, MemoryHistory, RecordingScripts, ScriptRunner};
use spa_navigator::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use spa_navigator::Navigator;

pub const ORIGIN: &str = "https://app.test";

/// A scripted reply for one path.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into(),
            delay: None,
            fail: false,
        }
    }

    pub fn json(value: Value) -> Self {
        Self {
            content_type: "application/json",
            ..Self::html(value.to_string())
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::html("error")
        }
    }

    pub fn network_failure() -> Self {
        Self {
            fail: true,
            ..Self::html("")
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Transport answering from a path-keyed script and logging every request.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn reply(&self, path: &str, reply: Reply) {
        self.replies.lock().insert(path.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL path equals `path`.
    pub fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| Url::parse(&r.url).map(|u| u.path() == path).unwrap_or(false))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let path = Url::parse(&request.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        let reply = self.replies.lock().get(&path).cloned();

        let Some(reply) = reply else {
            return Ok(TransportResponse {
                status: 404,
                content_type: Some("text/html".into()),
                body: "not found".into(),
                url: request.url,
            });
        };
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if reply.fail {
            return Err(TransportError::Network {
                url: request.url,
                message: "connection refused".into(),
            });
        }
        Ok(TransportResponse {
            status: reply.status,
            content_type: Some(reply.content_type.to_string()),
            body: reply.body,
            url: request.url,
        })
    }
}

/// Full document with a `#app` container.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><nav><a id=\"home\" href=\"/\">Home</a></nav>\
         <div id=\"app\">{body}</div></body></html>"
    )
}

/// A navigator on a headless host plus handles to every recorder.
pub struct TestHost {
    pub navigator: Arc<Navigator>,
    pub transport: Arc<MockTransport>,
    pub history: Arc<MemoryHistory>,
    pub window: Arc<HeadlessWindow>,
    pub scripts: Arc<RecordingScripts>,
}

impl TestHost {
    /// Host showing `document` at the origin root, with default config.
    pub fn new(document: &str) -> Self {
        Self::with_config(NavigatorConfig::default(), document)
    }

    pub fn with_config(config: NavigatorConfig, document: &str) -> Self {
        Self::build(config, document, None)
    }

    /// Host whose scripts go to `runner`; `scripts` then records nothing.
    pub fn with_script_runner(document: &str, runner: Arc<dyn ScriptRunner>) -> Self {
        Self::build(NavigatorConfig::default(), document, Some(runner))
    }

    fn build(
        config: NavigatorConfig,
        document: &str,
        runner: Option<Arc<dyn ScriptRunner>>,
    ) -> Self {
        let transport = Arc::new(MockTransport::default());
        let history = Arc::new(MemoryHistory::new());
        let window = Arc::new(HeadlessWindow::new());
        let scripts = Arc::new(RecordingScripts::new());
        let host = Host {
            surface: Arc::new(Mutex::new(MemoryDom::from_html(document))),
            transport: transport.clone(),
            history: history.clone(),
            window: window.clone(),
            scripts: runner.unwrap_or_else(|| scripts.clone()),
        };
        let location = Url::parse(&format!("{ORIGIN}/")).unwrap();
        let navigator = Arc::new(Navigator::new(config, host, location).unwrap());
        Self {
            navigator,
            transport,
            history,
            window,
            scripts,
        }
    }

    pub fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    pub fn node(&self, selector: &str) -> NodeId {
        let selector = Selector::parse(selector).unwrap();
        self.navigator.surface().lock().query(&selector).unwrap()
    }

    pub fn container_html(&self) -> String {
        let app = self.node("#app");
        self.navigator.surface().lock().inner_html(app)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.navigator.surface().lock().attribute(node, name)
    }
}
