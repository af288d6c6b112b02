//! HTML parsing into detached nodes.
//!
//! # Responsibilities
//! - Parse fragments for reconciliation
//! - Parse full documents for the headless surface
//! - Extract a page's container content and `<title>` from a fetched document
//!
//! # Design Decisions
//! - html5ever (through scraper) does the tokenizing and tree building, so
//!   markup is normalized the way a browser would normalize it
//! - Comments, doctypes and processing instructions are dropped

use scraper::{ElementRef, Html};

use crate::cache::CacheEntry;
use crate::dom::{Element, Node};

/// Parse a markup fragment into detached top-level nodes.
pub fn parse_fragment(markup: &str) -> Vec<Node> {
    let fragment = Html::parse_fragment(markup);
    convert_children(fragment.root_element())
}

/// Parse a full document, returning its `<html>` element.
pub fn parse_document(document: &str) -> Element {
    let html = Html::parse_document(document);
    convert_element(html.root_element())
}

/// Extract the container's inner HTML and the document title.
///
/// When the container is missing the whole `<body>` is used.
pub fn extract_page(document: &str, container: &str) -> CacheEntry {
    let html = Html::parse_document(document);

    let title = scraper::Selector::parse("title")
        .ok()
        .and_then(|s| html.select(&s).next().map(|t| t.text().collect::<String>()))
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    let content = scraper::Selector::parse(container)
        .ok()
        .and_then(|s| html.select(&s).next().map(|c| c.inner_html()))
        .or_else(|| {
            tracing::debug!(
                container = %container,
                "Container missing from fetched page, using body"
            );
            scraper::Selector::parse("body")
                .ok()
                .and_then(|s| html.select(&s).next().map(|b| b.inner_html()))
        })
        .unwrap_or_default();

    CacheEntry {
        html: content,
        title,
    }
}

fn convert_element(element: ElementRef<'_>) -> Element {
    let value = element.value();
    Element {
        tag: value.name().to_string(),
        attributes: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        children: convert_children(element),
    }
}

fn convert_children(element: ElementRef<'_>) -> Vec<Node> {
    element
        .children()
        .filter_map(|child| match child.value() {
            scraper::Node::Text(text) => Some(Node::Text(String::from(&**text))),
            scraper::Node::Element(_) => {
                ElementRef::wrap(child).map(|el| Node::Element(convert_element(el)))
            }
            _ => None,
        })
        .collect()
}
