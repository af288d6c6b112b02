//! Editable-control state transfer.
//!
//! When the reconciler has to replace a node outright, whatever the user
//! typed, ticked or selected in the outgoing control is copied onto the
//! incoming clone.

use crate::dom::{NodeId, Surface};

/// The kinds of controls whose state is carried across a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Checkbox or radio.
    Checkable,
    /// Text-like input or textarea.
    Text,
    /// Select element.
    Select,
}

const NON_EDITABLE_INPUTS: &[&str] = &["hidden", "submit", "button", "reset", "image", "file"];

/// Classify a node as an editable control.
pub fn control_kind(surface: &dyn Surface, node: NodeId) -> Option<ControlKind> {
    match surface.tag(node)? {
        "textarea" => Some(ControlKind::Text),
        "select" => Some(ControlKind::Select),
        "input" => {
            let input_type = surface
                .attribute(node, "type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string());
            match input_type.as_str() {
                "checkbox" | "radio" => Some(ControlKind::Checkable),
                t if NON_EDITABLE_INPUTS.contains(&t) => None,
                _ => Some(ControlKind::Text),
            }
        }
        _ => None,
    }
}

/// Copy user-edited state from `from` onto `to`, best effort.
///
/// Returns `true` when anything was transferred.
pub fn transfer_control_state(surface: &mut dyn Surface, from: NodeId, to: NodeId) -> bool {
    let (Some(_), Some(incoming_kind)) = (control_kind(surface, from), control_kind(surface, to))
    else {
        return false;
    };

    let outgoing = surface.control_state(from);
    let mut incoming = surface.control_state(to);
    let transferred = match incoming_kind {
        ControlKind::Checkable if outgoing.checked.is_some() => {
            incoming.checked = outgoing.checked;
            true
        }
        ControlKind::Text if outgoing.value.is_some() => {
            incoming.value = outgoing.value;
            true
        }
        ControlKind::Select if outgoing.selected_index.is_some() => {
            incoming.selected_index = outgoing.selected_index;
            true
        }
        _ => false,
    };

    if transferred {
        surface.set_control_state(to, incoming);
    }
    transferred
}
