//! Form submission.
//!
//! # Responsibilities
//! - Serialize a form's successful controls, reading live control state
//! - GET: rewrite the action URL's query and navigate
//! - Other methods: send a urlencoded body over the transport, then render
//!   the JSON or HTML response in place
//!
//! # Design Decisions
//! - Non-GET submissions skip `beforeEach`/`afterEach`; errors still reach
//!   `onError` and fall back to a conventional load of the action URL
//! - JSON with no route to render it is handed back as
//!   `NavigationOutcome::Data`

use url::form_urlencoded;
use url::Url;

use crate::dom::{NodeId, Surface};
use crate::navigation::context::{NavigateOptions, NavigationOutcome};
use crate::navigation::controller::{Navigator, Page};
use crate::navigation::error::{NavigationError, NavigationResult};
use crate::navigation::gestures::Gesture;
use crate::observability::metrics;
use crate::routing::RouteKind;
use crate::transport::TransportRequest;

/// Name/value pairs a form submits, in document order.
pub fn serialize_form(surface: &dyn Surface, form: NodeId) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for node in surface.descendants(form) {
        let Some(tag) = surface.tag(node) else {
            continue;
        };
        if !matches!(tag, "input" | "select" | "textarea") {
            continue;
        }
        let Some(name) = surface.attribute(node, "name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if surface.attribute(node, "disabled").is_some() {
            continue;
        }

        let state = surface.control_state(node);
        let value = match tag {
            "textarea" => state.value.unwrap_or_else(|| surface.text_content(node)),
            "select" => {
                let options: Vec<NodeId> = surface
                    .descendants(node)
                    .into_iter()
                    .filter(|&o| surface.tag(o) == Some("option"))
                    .collect();
                let preselected = || {
                    options
                        .iter()
                        .position(|&o| surface.attribute(o, "selected").is_some())
                };
                let selected = state.selected_index.or_else(preselected).unwrap_or(0);
                let Some(&option) = options.get(selected) else {
                    continue;
                };
                surface
                    .attribute(option, "value")
                    .unwrap_or_else(|| surface.text_content(option).trim().to_string())
            }
            _ => {
                let kind = surface
                    .attribute(node, "type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_default();
                match kind.as_str() {
                    "submit" | "button" | "reset" | "image" | "file" => continue,
                    "checkbox" | "radio" => {
                        let checked = state
                            .checked
                            .unwrap_or_else(|| surface.attribute(node, "checked").is_some());
                        if !checked {
                            continue;
                        }
                        surface.attribute(node, "value").unwrap_or_else(|| "on".to_string())
                    }
                    _ => state
                        .value
                        .or_else(|| surface.attribute(node, "value"))
                        .unwrap_or_default(),
                }
            }
        };
        fields.push((name, value));
    }
    fields
}

struct Submission {
    method: String,
    action: Url,
    fields: Vec<(String, String)>,
}

impl Navigator {
    /// Handle a form submission. `None` means the host should submit the
    /// form itself.
    pub async fn on_form_submitted(&self, gesture: &Gesture) -> Option<NavigationOutcome> {
        if gesture.default_prevented || gesture.modifiers.any() {
            return None;
        }
        let submission = self.submission(gesture.target)?;

        if submission.method == "GET" {
            let mut url = submission.action;
            url.set_query(None);
            if !submission.fields.is_empty() {
                url.query_pairs_mut().extend_pairs(&submission.fields);
            }
            return Some(self.navigate(url.as_str(), NavigateOptions::default()).await);
        }

        let action = submission.action.clone();
        let generation = self.begin();
        let outcome = match self.submit(submission, generation).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(e, None, &action, generation).await,
        };
        metrics::record_navigation(outcome.label());
        Some(outcome)
    }

    fn submission(&self, target: NodeId) -> Option<Submission> {
        let (method, action, fields) = {
            let surface = self.host.surface.lock();
            let form = surface.closest(target, &self.selectors().form)?;
            let method = surface
                .attribute(form, "method")
                .map(|m| m.trim().to_ascii_uppercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GET".to_string());
            let action = surface.attribute(form, "action").filter(|a| !a.trim().is_empty());
            (method, action, serialize_form(&*surface, form))
        };

        let action = match action {
            Some(action) => self.resolve(&action)?,
            None => self.location(),
        };
        if !self.same_origin(&action) {
            return None;
        }
        Some(Submission {
            method,
            action,
            fields,
        })
    }

    async fn submit(
        &self,
        submission: Submission,
        generation: u64,
    ) -> NavigationResult<NavigationOutcome> {
        let config = self.config();
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&submission.fields)
            .finish();
        let request = TransportRequest {
            method: submission.method.clone(),
            url: submission.action.to_string(),
            headers: Vec::new(),
            body: None,
        }
        .header(&config.request_header.name, &config.request_header.value)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body);

        tracing::debug!(method = %submission.method, url = %submission.action, "Submitting form");
        let response = self.host.transport.fetch(request).await?;
        if !response.is_success() {
            return Err(NavigationError::Status {
                url: submission.action.to_string(),
                status: response.status,
            });
        }

        if response.is_json() {
            let data: serde_json::Value =
                serde_json::from_str(&response.body).map_err(|source| NavigationError::InvalidJson {
                    url: submission.action.to_string(),
                    source,
                })?;
            return self.render_json(submission.action, data, generation).await;
        }

        let url = Url::parse(&response.url).unwrap_or(submission.action);
        let page: Page = crate::dom::extract_page(&response.body, &config.container).into();
        self.commit(&url, page, false, generation).await
    }

    async fn render_json(
        &self,
        action: Url,
        data: serde_json::Value,
        generation: u64,
    ) -> NavigationResult<NavigationOutcome> {
        let matched = self.match_route(&action);
        let renderer = matched.and_then(|m| match &m.route.kind {
            RouteKind::Loader {
                renderer: Some(renderer),
                ..
            }
            | RouteKind::Render(renderer) => Some((renderer.clone(), m.context())),
            _ => None,
        });

        let Some((renderer, ctx)) = renderer else {
            tracing::debug!(url = %action, data = %data, "Form response has no renderer");
            return Ok(NavigationOutcome::Data(data));
        };
        let page = self.render_with(renderer.as_ref(), Some(&data), &ctx).await?;
        self.commit(&action, page, false, generation).await
    }
}
