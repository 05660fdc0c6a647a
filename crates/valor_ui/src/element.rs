//! Immutable element descriptions.
//!
//! An [`Element`] is a cheap reference-counted handle. Cloning the handle
//! keeps its identity: reconciling an instance against the very element it
//! already holds is a no-op, which is how children passed through props
//! avoid re-rendering.

use core::cell::Cell;
use core::{fmt, mem};
use std::collections::HashSet;
use std::rc::Rc;

use log::warn;

use crate::component::ComponentClass;
use crate::instance::InstanceId;
use crate::value::{Value, ValueMap, merge_into};

/// Who produced an element. Assigned once, the first time the element is
/// passed to `render` or returned from an instance's render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Unclaimed,
    TopLevel,
    Instance(InstanceId),
}

#[derive(Clone)]
pub enum ElementType {
    /// An intrinsic node such as `div`.
    Host(String),
    /// Text appearing in a child list; mounted as a `span`.
    Text(String),
    Composite(Rc<ComponentClass>),
}

impl fmt::Debug for ElementType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(tag) => write!(formatter, "Host({tag})"),
            Self::Text(text) => write!(formatter, "Text({text:?})"),
            Self::Composite(class) => write!(formatter, "Composite({})", class.name()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    Empty,
    /// Inline text content of a host element.
    Text(String),
    Single(Element),
    List(Vec<Element>),
    /// Children named by an explicit key, in order.
    Keyed(Vec<(String, Element)>),
}

impl Children {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn inline_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Empty | Self::Single(_) | Self::List(_) | Self::Keyed(_) => None,
        }
    }

    /// The child elements, ignoring inline text.
    pub fn elements(&self) -> Vec<&Element> {
        match self {
            Self::Empty | Self::Text(_) => Vec::new(),
            Self::Single(element) => vec![element],
            Self::List(elements) => elements.iter().collect(),
            Self::Keyed(pairs) => pairs.iter().map(|(_, element)| element).collect(),
        }
    }

    /// The only child element, if there is exactly one.
    pub fn only(&self) -> Option<&Element> {
        match self.elements().as_slice() {
            [element] => Some(*element),
            _ => None,
        }
    }

    /// Child elements paired with their slot names: `$key` for keyed
    /// children, the position otherwise. Later duplicates are dropped.
    pub(crate) fn named(&self) -> Vec<(String, Element)> {
        let candidates: Vec<(String, &Element)> = match self {
            Self::Empty | Self::Text(_) => Vec::new(),
            Self::Single(element) => vec![(slot_name(element, 0), element)],
            Self::List(elements) => elements
                .iter()
                .enumerate()
                .map(|(index, element)| (slot_name(element, index), element))
                .collect(),
            Self::Keyed(pairs) => pairs
                .iter()
                .map(|(key, element)| (format!("${key}"), element))
                .collect(),
        };
        let mut seen = HashSet::new();
        let mut named = Vec::with_capacity(candidates.len());
        for (name, element) in candidates {
            if seen.insert(name.clone()) {
                named.push((name, element.clone()));
            } else {
                warn!(
                    target: "valor_ui::reconcile",
                    "duplicate child key {name} for {}; only the first child is used",
                    element.display_name()
                );
            }
        }
        named
    }

    fn push(&mut self, child: Element) {
        match mem::take(self) {
            Self::Empty => *self = Self::Single(child),
            Self::Text(text) => *self = Self::List(vec![Element::text(text), child]),
            Self::Single(first) => *self = Self::List(vec![first, child]),
            Self::List(mut elements) => {
                elements.push(child);
                *self = Self::List(elements);
            }
            Self::Keyed(mut pairs) => {
                let key = child.key().map_or_else(|| pairs.len().to_string(), str::to_owned);
                pairs.push((key, child));
                *self = Self::Keyed(pairs);
            }
        }
    }

    fn push_keyed(&mut self, key: String, child: Element) {
        let mut pairs = match mem::take(self) {
            Self::Keyed(pairs) => pairs,
            other => other
                .elements()
                .into_iter()
                .enumerate()
                .map(|(index, element)| (index.to_string(), element.clone()))
                .collect(),
        };
        pairs.push((key, child));
        *self = Self::Keyed(pairs);
    }

    fn push_text(&mut self, text: String) {
        if self.is_empty() {
            *self = Self::Text(text);
        } else {
            self.push(Element::text(text));
        }
    }

    fn claim(&self, owner: Owner) {
        for element in self.elements() {
            element.claim(owner);
        }
    }
}

fn slot_name(element: &Element, index: usize) -> String {
    element
        .key()
        .map_or_else(|| index.to_string(), |key| format!("${key}"))
}

struct ElementData {
    kind: ElementType,
    props: ValueMap,
    key: Option<String>,
    ref_name: Option<String>,
    children: Children,
    owner: Cell<Owner>,
}

#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    /// A text child for use inside a child list.
    pub fn text(text: impl Into<String>) -> Self {
        ElementBuilder::new(ElementType::Text(text.into())).build()
    }

    pub fn kind(&self) -> &ElementType {
        &self.0.kind
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            ElementType::Host(tag) => Some(tag),
            ElementType::Text(_) | ElementType::Composite(_) => None,
        }
    }

    pub fn class(&self) -> Option<&Rc<ComponentClass>> {
        match &self.0.kind {
            ElementType::Composite(class) => Some(class),
            ElementType::Host(_) | ElementType::Text(_) => None,
        }
    }

    pub fn props(&self) -> &ValueMap {
        &self.0.props
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.0.props.get(name)
    }

    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    pub fn ref_name(&self) -> Option<&str> {
        self.0.ref_name.as_deref()
    }

    pub fn children(&self) -> &Children {
        &self.0.children
    }

    pub fn owner(&self) -> Owner {
        self.0.owner.get()
    }

    /// Tag, component name or `#text`.
    pub fn display_name(&self) -> &str {
        match &self.0.kind {
            ElementType::Host(tag) => tag,
            ElementType::Text(_) => "#text",
            ElementType::Composite(class) => class.name(),
        }
    }

    /// Whether both handles refer to the same element value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn same_type(&self, other: &Self) -> bool {
        match (&self.0.kind, &other.0.kind) {
            (ElementType::Host(left), ElementType::Host(right)) => left == right,
            (ElementType::Text(_), ElementType::Text(_)) => true,
            (ElementType::Composite(left), ElementType::Composite(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Whether an instance holding `self` can be updated in place to `next`:
    /// same type, key and owner.
    pub fn can_update_to(&self, next: &Self) -> bool {
        self.same_type(next) && self.key() == next.key() && self.owner() == next.owner()
    }

    /// Stamp `owner` on this element and, through children and element-valued
    /// props, on everything it carries that is still unclaimed.
    pub(crate) fn claim(&self, owner: Owner) {
        if self.owner() != Owner::Unclaimed {
            return;
        }
        self.0.owner.set(owner);
        self.0.children.claim(owner);
        for value in self.0.props.values() {
            if let Value::Element(element) = value {
                element.claim(owner);
            }
        }
    }

    /// Copy with different props, key and ref. The copy keeps the owner stamp.
    pub(crate) fn rebuild(&self, props: ValueMap, key: Option<String>, ref_name: Option<String>) -> Self {
        self.copy_with(props, key, ref_name, self.owner())
    }

    /// Copy that has not been claimed by anyone yet.
    pub(crate) fn clone_unclaimed(
        &self,
        props: ValueMap,
        key: Option<String>,
        ref_name: Option<String>,
    ) -> Self {
        self.copy_with(props, key, ref_name, Owner::Unclaimed)
    }

    fn copy_with(
        &self,
        props: ValueMap,
        key: Option<String>,
        ref_name: Option<String>,
        owner: Owner,
    ) -> Self {
        Self(Rc::new(ElementData {
            kind: self.0.kind.clone(),
            props,
            key,
            ref_name,
            children: self.0.children.clone(),
            owner: Cell::new(owner),
        }))
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Element")
            .field("kind", &self.0.kind)
            .field("key", &self.0.key)
            .field("ref", &self.0.ref_name)
            .field("owner", &self.owner())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Builder for [`Element`]s. Start one with [`host`] or `ComponentClass::create`.
#[derive(Debug)]
pub struct ElementBuilder {
    kind: ElementType,
    props: ValueMap,
    key: Option<String>,
    ref_name: Option<String>,
    children: Children,
}

/// Start an intrinsic element such as `div`.
pub fn host(tag: &str) -> ElementBuilder {
    ElementBuilder::new(ElementType::Host(tag.to_owned()))
}

impl ElementBuilder {
    pub const fn new(kind: ElementType) -> Self {
        Self {
            kind,
            props: ValueMap::new(),
            key: None,
            ref_name: None,
            children: Children::Empty,
        }
    }

    #[must_use]
    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.insert(name.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn props(mut self, props: &ValueMap) -> Self {
        merge_into(&mut self.props, props);
        self
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.ref_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn keyed_child(mut self, key: impl Into<String>, child: impl Into<Element>) -> Self {
        self.children.push_keyed(key.into(), child.into());
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push_text(text.into());
        self
    }

    /// Replace all children, e.g. to pass through a component's own children.
    #[must_use]
    pub fn children(mut self, children: Children) -> Self {
        self.children = children;
        self
    }

    pub fn build(self) -> Element {
        Element(Rc::new(ElementData {
            kind: self.kind,
            props: self.props,
            key: self.key,
            ref_name: self.ref_name,
            children: self.children,
            owner: Cell::new(Owner::Unclaimed),
        }))
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use indextree::Arena;

    use super::*;

    #[test]
    fn slot_names_use_keys_then_positions() {
        let element = host("ul")
            .child(host("li"))
            .child(host("li").key("b"))
            .text("tail")
            .build();
        let names: Vec<String> = element
            .children()
            .named()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["0", "$b", "2"]);
    }

    #[test]
    fn duplicate_keys_keep_the_first_child() {
        let first = host("li").key("a").build();
        let element = host("ul")
            .child(first.clone())
            .child(host("p").key("a"))
            .build();
        let named = element.children().named();
        assert_eq!(named.len(), 1);
        assert!(named[0].1.ptr_eq(&first));
    }

    #[test]
    fn lone_text_is_inline() {
        let element = host("span").text("hi").build();
        assert_eq!(element.children().inline_text(), Some("hi"));
        assert!(element.children().named().is_empty());
    }

    #[test]
    fn claim_is_assigned_once_and_reaches_nested_elements() {
        let nested = host("b").build();
        let child = host("i").build();
        let element = host("div")
            .prop("icon", nested.clone())
            .child(child.clone())
            .build();
        element.claim(Owner::TopLevel);
        assert_eq!(nested.owner(), Owner::TopLevel);
        assert_eq!(child.owner(), Owner::TopLevel);

        let mut arena = Arena::new();
        let instance = InstanceId::from(arena.new_node(()));
        let other = host("div").child(child.clone()).build();
        other.claim(Owner::Instance(instance));
        assert_eq!(other.owner(), Owner::Instance(instance));
        assert_eq!(child.owner(), Owner::TopLevel);
    }

    #[test]
    fn update_in_place_requires_type_key_and_owner() {
        let left = host("div").key("a").build();
        let right = host("div").key("a").build();
        assert!(left.can_update_to(&right));
        assert!(!left.can_update_to(&host("span").key("a").build()));
        assert!(!left.can_update_to(&host("div").key("b").build()));
        right.claim(Owner::TopLevel);
        assert!(!left.can_update_to(&right));
    }
}
