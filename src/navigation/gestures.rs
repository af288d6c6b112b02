//! Link activation.

use url::Url;

use crate::dom::NodeId;
use crate::navigation::context::{NavigateOptions, NavigationOutcome};
use crate::navigation::controller::Navigator;

/// Modifier keys held during a gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }
}

/// A user gesture (click, submit, hover) reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gesture {
    /// Node the gesture landed on; the link or form may be an ancestor.
    pub target: NodeId,
    /// Mouse button, 0 being primary.
    pub button: u16,
    pub modifiers: Modifiers,
    /// Another handler already cancelled the default action.
    pub default_prevented: bool,
}

impl Gesture {
    /// Plain primary-button gesture on `target`.
    pub fn primary(target: NodeId) -> Self {
        Self {
            target,
            button: 0,
            modifiers: Modifiers::default(),
            default_prevented: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    pub fn prevented(mut self) -> Self {
        self.default_prevented = true;
        self
    }

    /// Whether the host would perform a plain same-tab activation.
    pub fn is_plain(&self) -> bool {
        self.button == 0 && !self.modifiers.any() && !self.default_prevented
    }
}

impl Navigator {
    /// Handle a link activation. `None` means the gesture is not ours and the
    /// host should keep its default behaviour.
    pub async fn on_link_activated(&self, gesture: &Gesture) -> Option<NavigationOutcome> {
        if !gesture.is_plain() {
            return None;
        }
        let url = self.eligible_link(gesture.target)?;
        Some(self.navigate(url.as_str(), NavigateOptions::default()).await)
    }

    /// Resolve the in-app link enclosing `target`, if there is one.
    pub(crate) fn eligible_link(&self, target: NodeId) -> Option<Url> {
        let config = self.config();
        let href = {
            let surface = self.host.surface.lock();
            let link = surface.closest(target, &self.selectors().link)?;
            let opens_elsewhere = surface
                .attribute(link, "target")
                .is_some_and(|t| !t.is_empty() && !t.eq_ignore_ascii_case("_self"));
            if opens_elsewhere || surface.attribute(link, "download").is_some() {
                return None;
            }
            surface.attribute(link, &config.link_attr_name)?
        };

        let url = self.resolve(&href)?;
        if !self.same_origin(&url) {
            return None;
        }
        // In-page anchors are left to the host.
        let mut current = self.location();
        current.set_fragment(url.fragment());
        if url.fragment().is_some() && url == current {
            return None;
        }
        Some(url)
    }
}
