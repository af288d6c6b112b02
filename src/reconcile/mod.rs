//! Tree reconciler.
//!
//! # Data Flow
//! ```text
//! new markup
//!     → dom::parse_fragment (detached target tree)
//!     → patch_children(container, targets), per child in target order:
//!         keyed match anywhere ahead  → move + patch
//!         no old child at index       → append clone
//!         same node at index          → patch in place
//!         same node further ahead     → move + patch
//!         old child wanted later      → insert clone before it
//!         otherwise                   → replace with clone (control state carried)
//!     → drop surplus old children
//!     → PatchReport { mutations, scripts }
//!     → scripts.rs activates the new scripts
//! ```
//!
//! # Design Decisions
//! - Same node: both text, or same tag and (when either side is keyed) same key
//! - Moves never clone, so keyed nodes keep identity, focus and state
//! - Elements marked `data-preserve` on either side are never touched
//! - The script activation marker is host state, not markup, so attribute
//!   reconciliation never removes it

pub mod controls;
pub mod scripts;

use crate::dom::{parse_fragment, Node, NodeId, Surface};
use crate::reconcile::controls::transfer_control_state;
use crate::reconcile::scripts::is_pending_script;

pub use scripts::activate_scripts;

/// Attribute carrying a stable identity across reorders.
pub const KEY_ATTR: &str = "data-key";

/// Attribute opting an element and its subtree out of patching.
pub const PRESERVE_ATTR: &str = "data-preserve";

/// Attribute set on scripts once they have been activated.
pub const EXECUTED_ATTR: &str = "data-nav-executed";

/// What a patch did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Structural, attribute and text mutations applied.
    pub mutations: usize,
    /// Newly introduced scripts awaiting activation, in document order.
    pub scripts: Vec<NodeId>,
}

/// Patch the children of `root` to match `markup`.
pub fn patch(surface: &mut dyn Surface, root: NodeId, markup: &str) -> PatchReport {
    let targets = parse_fragment(markup);
    let mut patcher = Patcher {
        surface,
        report: PatchReport::default(),
    };
    patcher.children(root, &targets);
    tracing::trace!(
        mutations = patcher.report.mutations,
        scripts = patcher.report.scripts.len(),
        "Patch applied"
    );
    patcher.report
}

struct Patcher<'s> {
    surface: &'s mut dyn Surface,
    report: PatchReport,
}

impl Patcher<'_> {
    fn children(&mut self, parent: NodeId, targets: &[Node]) {
        let mut index = 0;
        for target in targets {
            let current = self.surface.children(parent);

            if let Some(key) = target.attribute(KEY_ATTR) {
                let keyed = current
                    .iter()
                    .skip(index)
                    .copied()
                    .find(|&c| self.key(c).as_deref() == Some(key) && self.same_node(c, target));
                if let Some(keyed) = keyed {
                    self.place(parent, keyed, current.get(index).copied());
                    self.node(keyed, target);
                    index += 1;
                    continue;
                }
            }

            let Some(&old) = current.get(index) else {
                let created = self.surface.create(target);
                self.surface.insert_before(parent, created, None);
                self.introduce(created);
                index += 1;
                continue;
            };

            if self.same_node(old, target) {
                self.node(old, target);
            } else if self.is_preserved(old) {
                // Preserved nodes are never replaced; new content goes in
                // front of them instead.
                let created = self.surface.create(target);
                self.surface.insert_before(parent, created, Some(old));
                self.introduce(created);
            } else if let Some(ahead) = current
                .iter()
                .skip(index + 1)
                .copied()
                .find(|&c| self.same_node(c, target))
            {
                self.place(parent, ahead, Some(old));
                self.node(ahead, target);
            } else if targets[index + 1..].iter().any(|t| self.same_node(old, t)) {
                // `old` is still wanted further down: this is an insertion.
                let created = self.surface.create(target);
                self.surface.insert_before(parent, created, Some(old));
                self.introduce(created);
            } else {
                let created = self.surface.create(target);
                transfer_control_state(self.surface, old, created);
                self.surface.replace(old, created);
                self.introduce(created);
            }
            index += 1;
        }

        for extra in self.surface.children(parent).into_iter().skip(index) {
            if !self.is_preserved(extra) {
                self.surface.remove(extra);
                self.report.mutations += 1;
            }
        }
    }

    fn node(&mut self, old: NodeId, target: &Node) {
        if self.is_preserved(old) || target.attribute(PRESERVE_ATTR).is_some() {
            return;
        }
        match target {
            Node::Text(text) => {
                if self.surface.text(old) != Some(text.as_str()) {
                    self.surface.set_text(old, text);
                    self.report.mutations += 1;
                }
            }
            Node::Element(el) => {
                let current = self.surface.attributes(old);
                for (name, _) in &current {
                    if name != EXECUTED_ATTR && el.attribute(name).is_none() {
                        self.surface.remove_attribute(old, name);
                        self.report.mutations += 1;
                    }
                }
                for (name, value) in &el.attributes {
                    let unchanged = current.iter().any(|(k, v)| k == name && v == value);
                    if !unchanged {
                        self.surface.set_attribute(old, name, value);
                        self.report.mutations += 1;
                    }
                }
                self.children(old, &el.children);
            }
        }
    }

    fn same_node(&self, old: NodeId, target: &Node) -> bool {
        match target {
            Node::Text(_) => self.surface.text(old).is_some(),
            Node::Element(el) => {
                self.surface.tag(old) == Some(el.tag.as_str())
                    && self.key(old).as_deref() == el.attribute(KEY_ATTR)
            }
        }
    }

    fn key(&self, node: NodeId) -> Option<String> {
        self.surface.attribute(node, KEY_ATTR)
    }

    fn is_preserved(&self, node: NodeId) -> bool {
        self.surface.attribute(node, PRESERVE_ATTR).is_some()
    }

    /// Move `node` before `reference` unless it is already there.
    fn place(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if reference != Some(node) {
            self.surface.insert_before(parent, node, reference);
            self.report.mutations += 1;
        }
    }

    /// Account for a freshly inserted subtree and collect its scripts.
    fn introduce(&mut self, created: NodeId) {
        self.report.mutations += 1;
        for node in self.surface.descendants(created) {
            if is_pending_script(self.surface, node) {
                self.report.scripts.push(node);
            }
        }
    }
}
