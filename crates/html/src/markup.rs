//! Structured markup produced by mounting and consumed by the host document.
//!
//! Markup is a plain tree rather than a string so the document can
//! materialize it without a parser; [`Markup::to_html`] gives the canonical
//! serialization used for server rendering and checksums.

use smallvec::SmallVec;

/// Elements that never have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A markup tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Element {
        tag: String,
        attrs: SmallVec<(String, String), 4>,
        children: Vec<Markup>,
    },
    Text(String),
}

impl Markup {
    /// Create an element with no attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: SmallVec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Builder form of [`Markup::set_attr`].
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`Markup::push_child`].
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.push_child(child);
        self
    }

    /// Set an attribute, replacing an existing value of the same name.
    /// Text nodes ignore attributes.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Self::Element { attrs, .. } = self {
            let name = name.into();
            let value = value.into();
            if let Some(slot) = attrs.iter_mut().find(|(existing, _)| *existing == name) {
                slot.1 = value;
            } else {
                attrs.push((name, value));
            }
        }
    }

    pub fn push_child(&mut self, child: Self) {
        if let Self::Element { children, .. } = self {
            children.push(child);
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            Self::Text(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs
                .iter()
                .find(|(existing, _)| existing == name)
                .map(|(_, value)| value.as_str()),
            Self::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[Self] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text(_) => &[],
        }
    }

    /// Serialize to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(text) => escape_text(text, out),
            Self::Element {
                tag,
                attrs,
                children,
            } => {
                write_open_tag(tag, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())), out);
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Serialize a sequence of sibling nodes.
pub fn to_html(nodes: &[Markup]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_html(&mut out);
    }
    out
}

pub(crate) fn write_open_tag<'a>(
    tag: &str,
    attrs: impl Iterator<Item = (&'a str, &'a str)>,
    out: &mut String,
) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
}

pub fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
}
