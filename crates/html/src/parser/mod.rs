//! HTML parsing into [`Markup`] trees using html5ever.
//!
//! Used to load existing (usually server-rendered) markup into a document
//! before a client mount adopts it.

use crate::markup::Markup;
use html5ever::tendril::TendrilSink as _;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Parse a complete document. Returns the document's top-level nodes,
/// normally a single `html` element with `head` and `body`.
pub fn parse_document_markup(html: &str) -> Vec<Markup> {
    let dom = parse_rc_dom(html);
    convert_children(&dom.document)
}

/// Parse markup meant for a container's inner content. The HTML tree
/// builder wraps it in `html`/`body`; only the body's children are returned.
pub fn parse_fragment_markup(html: &str) -> Vec<Markup> {
    let dom = parse_rc_dom(html);
    find_body(&dom.document)
        .map(|body| convert_children(&body))
        .unwrap_or_default()
}

fn parse_rc_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

fn find_body(handle: &Handle) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data
        && &*name.local == "body"
    {
        return Some(Handle::clone(handle));
    }
    handle.children.borrow().iter().find_map(find_body)
}

fn convert_children(handle: &Handle) -> Vec<Markup> {
    handle
        .children
        .borrow()
        .iter()
        .filter_map(convert_node)
        .collect()
}

fn convert_node(handle: &Handle) -> Option<Markup> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut element = Markup::element(name.local.to_string());
            for attr in attrs.borrow().iter() {
                element.set_attr(attr.name.local.to_string(), attr.value.to_string());
            }
            for child in convert_children(handle) {
                element.push_child(child);
            }
            Some(element)
        }
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            // Whitespace between tags is formatting, not content.
            if text.trim().is_empty() {
                None
            } else {
                Some(Markup::Text(text))
            }
        }
        NodeData::Document
        | NodeData::Doctype { .. }
        | NodeData::Comment { .. }
        | NodeData::ProcessingInstruction { .. } => None,
    }
}
