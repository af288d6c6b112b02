//! Abstract node model and the render-surface capability.
//!
//! # Data Flow
//! ```text
//! markup string
//!     → parse.rs (scraper/html5ever) → detached Node tree
//!     → reconcile patches a live Surface toward it
//!
//! live Surface (host-owned, addressed by NodeId)
//!     → serialize.rs via snapshot() → HTML for history snapshots
//! ```
//!
//! # Design Decisions
//! - Detached trees are plain values: `Node::{Element, Text}`
//! - Live trees are behind the `Surface` trait so the reconciler never
//!   depends on a concrete host; `MemoryDom` is the headless host
//! - Only primitive operations are required; queries, `closest`,
//!   `inner_html` and friends are provided on top of them
//! - Selectors use scraper's grammar on both sides, so a configured
//!   container finds the same element in fetched pages and the live tree
//! - Control state (`value`, `checked`, selected index) is separate from
//!   attributes, as in a browser

pub mod memory;
pub mod parse;
pub mod selector;
pub mod serialize;

use std::sync::Arc;

use parking_lot::Mutex;

pub use memory::MemoryDom;
pub use parse::{extract_page, parse_document, parse_fragment};
pub use selector::{Selector, SelectorError};
pub use serialize::to_html;

/// Handle to a node in a live surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A detached node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A detached element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.as_element().and_then(|el| el.attribute(name))
    }
}

/// User-editable state of a form control.
///
/// `None` fields mean "not touched": the markup default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub selected_index: Option<usize>,
}

/// A live, mutable node tree owned by the host.
pub trait Surface: Send {
    /// The document root.
    fn root(&self) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Tag name for elements, `None` for text nodes.
    fn tag(&self, node: NodeId) -> Option<&str>;

    /// Content for text nodes, `None` for elements.
    fn text(&self, node: NodeId) -> Option<&str>;

    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn set_text(&mut self, node: NodeId, text: &str);

    /// Build a detached copy of `node` inside the surface.
    fn create(&mut self, node: &Node) -> NodeId;

    /// Insert (or move) `child` under `parent` before `reference`;
    /// `None` appends.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>);

    /// Put `new` where `old` is and discard `old`.
    ///
    /// Ids of discarded subtrees may be handed out again by `create`.
    fn replace(&mut self, old: NodeId, new: NodeId);

    /// Detach and discard `node` and its subtree.
    fn remove(&mut self, node: NodeId);

    fn control_state(&self, node: NodeId) -> ControlState;

    fn set_control_state(&mut self, node: NodeId, state: ControlState);

    /// Detached copy of the subtree rooted at `node`.
    fn snapshot(&self, node: NodeId) -> Option<Node>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attributes(node)
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Subtree of `node` in document order, `node` included.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        selector.select(self, self.root())
    }

    fn query(&self, selector: &Selector) -> Option<NodeId> {
        self.query_all(selector).into_iter().next()
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        selector.closest(self, node)
    }

    /// Whether `node` is reachable from the root.
    fn is_connected(&self, node: NodeId) -> bool {
        let root = self.root();
        let mut current = Some(node);
        while let Some(n) = current {
            if n == root {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n).map(str::to_string))
            .collect()
    }

    /// Serialized children of `node`.
    fn inner_html(&self, node: NodeId) -> String {
        let children: Vec<Node> = self
            .children(node)
            .into_iter()
            .filter_map(|c| self.snapshot(c))
            .collect();
        to_html(&children)
    }
}

/// A surface shared between the navigator and its host.
pub type SharedSurface = Arc<Mutex<dyn Surface>>;
