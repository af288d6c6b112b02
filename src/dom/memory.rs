//! In-memory surface.
//!
//! An arena of nodes addressed by `NodeId`. Moves keep a node's slot, so ids
//! stay valid across reorders, which is what lets tests observe identity
//! preservation. Removed and replaced subtrees give their slots back; each
//! slot carries a generation encoded in its ids, so a stale id resolves to
//! nothing instead of to whichever node reused the slot.

use crate::dom::{parse_document, ControlState, Element, Node, NodeId, Surface};

const INDEX_BITS: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;

#[derive(Debug, Clone)]
enum Data {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    generation: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: Data,
    control: ControlState,
}

impl Slot {
    fn vacant(generation: usize) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            data: Data::Text(String::new()),
            control: ControlState::default(),
        }
    }
}

/// Arena-backed live tree.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    focused: Option<NodeId>,
}

impl MemoryDom {
    /// Build a surface from a full HTML document.
    pub fn from_html(document: &str) -> Self {
        Self::from_element(&parse_document(document))
    }

    pub fn from_element(root: &Element) -> Self {
        let mut dom = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            focused: None,
        };
        dom.root = dom.alloc(&Node::Element(root.clone()));
        dom
    }

    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    /// The focused node, if it is still attached.
    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|&n| self.is_connected(n))
    }

    /// Number of nodes currently held, attached or not.
    pub fn live_nodes(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of slots in the arena, including free ones.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn alloc(&mut self, node: &Node) -> NodeId {
        let (data, children) = match node {
            Node::Text(text) => (Data::Text(text.clone()), &[][..]),
            Node::Element(el) => (
                Data::Element {
                    tag: el.tag.clone(),
                    attributes: el.attributes.clone(),
                },
                el.children.as_slice(),
            ),
        };
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::vacant(0));
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.data = data;
        let id = NodeId((slot.generation << INDEX_BITS) | index);

        for child in children {
            let child_id = self.alloc(child);
            self.slots[child_id.0 & INDEX_MASK].parent = Some(id);
            self.slots[index].children.push(child_id);
        }
        id
    }

    /// Slot index for a live id.
    fn index(&self, node: NodeId) -> Option<usize> {
        let index = node.0 & INDEX_MASK;
        let slot = self.slots.get(index)?;
        (slot.generation == node.0 >> INDEX_BITS).then_some(index)
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.index(node).map(|i| &self.slots[i])
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot> {
        self.index(node).map(|i| &mut self.slots[i])
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.slot(node).and_then(|s| s.parent) else {
            return;
        };
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.retain(|&c| c != node);
        }
        if let Some(slot) = self.slot_mut(node) {
            slot.parent = None;
        }
    }

    /// Give the slots of a detached subtree back to the arena.
    fn release(&mut self, node: NodeId) {
        for id in self.descendants(node) {
            let Some(index) = self.index(id) else {
                continue;
            };
            if self.focused == Some(id) {
                self.focused = None;
            }
            let generation = (self.slots[index].generation + 1) & (usize::MAX >> INDEX_BITS);
            self.slots[index] = Slot::vacant(generation);
            self.free.push(index);
        }
    }

    fn attributes_mut(&mut self, node: NodeId) -> Option<&mut Vec<(String, String)>> {
        match self.slot_mut(node).map(|s| &mut s.data) {
            Some(Data::Element { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }
}

impl Surface for MemoryDom {
    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).and_then(|s| s.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.slot(node).map(|s| s.children.clone()).unwrap_or_default()
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match self.slot(node).map(|s| &s.data) {
            Some(Data::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match self.slot(node).map(|s| &s.data) {
            Some(Data::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.slot(node).map(|s| &s.data) {
            Some(Data::Element { attributes, .. }) => attributes.clone(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(attributes) = self.attributes_mut(node) {
            match attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(attributes) = self.attributes_mut(node) {
            attributes.retain(|(k, _)| k != name);
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(Data::Text(current)) = self.slot_mut(node).map(|s| &mut s.data) {
            *current = text.to_string();
        }
    }

    fn create(&mut self, node: &Node) -> NodeId {
        self.alloc(node)
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.index(parent).is_none() || self.index(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(parent) {
            let index = reference
                .and_then(|r| slot.children.iter().position(|&c| c == r))
                .unwrap_or(slot.children.len());
            slot.children.insert(index, child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
    }

    fn replace(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        if old == new || self.index(new).is_none() {
            return;
        }
        self.detach(new);
        let position = self
            .slot(parent)
            .and_then(|s| s.children.iter().position(|&c| c == old));
        if let (Some(position), Some(index)) = (position, self.index(parent)) {
            self.slots[index].children[position] = new;
            if let Some(slot) = self.slot_mut(new) {
                slot.parent = Some(parent);
            }
            if let Some(slot) = self.slot_mut(old) {
                slot.parent = None;
            }
            self.release(old);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        self.release(node);
    }

    fn control_state(&self, node: NodeId) -> ControlState {
        self.slot(node).map(|s| s.control.clone()).unwrap_or_default()
    }

    fn set_control_state(&mut self, node: NodeId, state: ControlState) {
        if let Some(slot) = self.slot_mut(node) {
            slot.control = state;
        }
    }

    fn snapshot(&self, node: NodeId) -> Option<Node> {
        let slot = self.slot(node)?;
        Some(match &slot.data {
            Data::Text(text) => Node::Text(text.clone()),
            Data::Element { tag, attributes } => Node::Element(Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                children: slot
                    .children
                    .iter()
                    .filter_map(|&c| self.snapshot(c))
                    .collect(),
            }),
        })
    }
}
