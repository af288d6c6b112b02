//! CSS selectors for live surfaces.
//!
//! Parsing uses scraper's selector grammar, so anything accepted for
//! fetched markup is accepted for the live tree too. Matching runs the
//! `selectors` engine over a `SurfaceElement` handle.

use std::collections::HashMap;
use std::fmt;

use scraper::error::SelectorErrorKind;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{
    self, ElementSelectorFlags, MatchingContext, MatchingForInvalidation, MatchingMode,
    NeedsSelectorFlags, QuirksMode, SelectorCaches,
};
use selectors::parser::{ParseRelative, SelectorImpl, SelectorList};
use selectors::{Element, OpaqueElement};
use thiserror::Error;

use super::{NodeId, Surface};

type Namespace = <Simple as SelectorImpl>::NamespaceUrl;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

/// A parsed selector group.
#[derive(Clone)]
pub struct Selector {
    source: String,
    list: SelectorList<Simple>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);
        SelectorList::parse(&scraper::selector::Parser, &mut parser, ParseRelative::No)
            .map(|list| Self {
                source: source.to_string(),
                list,
            })
            .map_err(|err| SelectorError {
                selector: source.to_string(),
                reason: SelectorErrorKind::from(err).to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<S: Surface + ?Sized>(&self, surface: &S, node: NodeId) -> bool {
        let scope = MatchScope::around(surface, node);
        self.matches_in(&scope, node)
    }

    /// Matching nodes under `root` (inclusive) in document order.
    pub fn select<S: Surface + ?Sized>(&self, surface: &S, root: NodeId) -> Vec<NodeId> {
        let scope = MatchScope::around(surface, root);
        surface
            .descendants(root)
            .into_iter()
            .filter(|&n| self.matches_in(&scope, n))
            .collect()
    }

    /// Nearest inclusive ancestor of `node` that matches.
    pub fn closest<S: Surface + ?Sized>(&self, surface: &S, node: NodeId) -> Option<NodeId> {
        let scope = MatchScope::around(surface, node);
        let mut current = Some(node);
        while let Some(n) = current {
            if self.matches_in(&scope, n) {
                return Some(n);
            }
            current = surface.parent(n);
        }
        None
    }

    fn matches_in<S: Surface + ?Sized>(&self, scope: &MatchScope<'_, S>, node: NodeId) -> bool {
        let Some(element) = scope.element(node) else {
            return false;
        };
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        self.list
            .slice()
            .iter()
            .any(|s| matching::matches_selector(s, 0, None, &element, &mut context))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.source).finish()
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Selector {}

/// Every node of the tree containing some node, each with a stable cell
/// the matcher can use as its identity.
struct MatchScope<'s, S: ?Sized> {
    surface: &'s S,
    cells: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
}

impl<'s, S: Surface + ?Sized> MatchScope<'s, S> {
    fn around(surface: &'s S, node: NodeId) -> Self {
        let mut top = node;
        while let Some(parent) = surface.parent(top) {
            top = parent;
        }
        let cells = surface.descendants(top);
        let index = cells.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        Self {
            surface,
            cells,
            index,
        }
    }

    fn element(&self, node: NodeId) -> Option<SurfaceElement<'_, 's, S>> {
        self.surface.tag(node)?;
        let &index = self.index.get(&node)?;
        Some(SurfaceElement { scope: self, index })
    }
}

/// An element of a live surface, as seen by the selector engine.
struct SurfaceElement<'a, 's, S: ?Sized> {
    scope: &'a MatchScope<'s, S>,
    index: usize,
}

impl<S: ?Sized> Clone for SurfaceElement<'_, '_, S> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope,
            index: self.index,
        }
    }
}

impl<S: ?Sized> fmt::Debug for SurfaceElement<'_, '_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SurfaceElement").field(&self.scope.cells[self.index]).finish()
    }
}

impl<'a, 's, S: Surface + ?Sized> SurfaceElement<'a, 's, S> {
    fn node(&self) -> NodeId {
        self.scope.cells[self.index]
    }

    fn surface(&self) -> &'s S {
        self.scope.surface
    }

    fn tag(&self) -> &str {
        self.scope.surface.tag(self.node()).unwrap_or_default()
    }

    fn sibling_elements(&self) -> (Vec<NodeId>, Option<usize>) {
        let siblings: Vec<NodeId> = self
            .surface()
            .parent(self.node())
            .map(|p| self.surface().children(p))
            .unwrap_or_default()
            .into_iter()
            .filter(|&n| self.surface().tag(n).is_some())
            .collect();
        let position = siblings.iter().position(|&n| n == self.node());
        (siblings, position)
    }

    fn wrap(&self, node: NodeId) -> Option<Self> {
        let scope: &'a MatchScope<'s, S> = self.scope;
        scope.element(node)
    }
}

impl<S: Surface + ?Sized> Element for SurfaceElement<'_, '_, S> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(&self.scope.cells[self.index])
    }

    fn parent_element(&self) -> Option<Self> {
        self.surface().parent(self.node()).and_then(|p| self.wrap(p))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let (siblings, position) = self.sibling_elements();
        let previous = position?.checked_sub(1)?;
        self.wrap(siblings[previous])
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let (siblings, position) = self.sibling_elements();
        siblings.get(position? + 1).and_then(|&n| self.wrap(n))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.surface()
            .children(self.node())
            .into_iter()
            .find_map(|c| self.wrap(c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.tag() == &*name.0
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        &**namespace == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        // Attributes on the surface carry no namespace.
        if let NamespaceConstraint::Specific(url) = ns {
            if !url.is_empty() {
                return false;
            }
        }
        self.surface()
            .attributes(self.node())
            .iter()
            .any(|(name, value)| name.as_str() == &*local_name.0 && operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.tag(), "a" | "area" | "link")
            && self.surface().attribute(self.node(), "href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.surface()
            .attribute(self.node(), "id")
            .is_some_and(|v| case_sensitivity.eq(id.0.as_bytes(), v.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.surface()
            .attribute(self.node(), "class")
            .is_some_and(|v| {
                v.split_ascii_whitespace()
                    .any(|c| case_sensitivity.eq(name.0.as_bytes(), c.as_bytes()))
            })
    }

    fn has_custom_state(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self.surface().children(self.node()).into_iter().any(|c| {
            self.surface().tag(c).is_some()
                || self.surface().text(c).is_some_and(|t| !t.is_empty())
        })
    }

    fn is_root(&self) -> bool {
        self.node() == self.surface().root()
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}
