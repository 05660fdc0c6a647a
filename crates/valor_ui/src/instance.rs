//! Live instances, stored in an arena owned by the runtime.
//!
//! The arena's tree mirrors the mount tree: a host instance's arena children
//! are its child instances in document order, a composite has exactly one
//! arena child (what it rendered). Owner and ref links are plain
//! [`InstanceId`] lookups and are removed when the target unmounts.

use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use html::NodeKey;
use indextree::NodeId;

use crate::component::ComponentClass;
use crate::element::{Element, ElementType};
use crate::value::ValueMap;

/// Handle to an instance. Never reused for another instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(NodeId);

impl InstanceId {
    pub(crate) const fn node(self) -> NodeId {
        self.0
    }
}

impl From<NodeId> for InstanceId {
    fn from(node: NodeId) -> Self {
        Self(node)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "instance {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, will-mount and render running; not yet attached.
    Mounting,
    Mounted,
    /// will-unmount running; further updates are dropped.
    Unmounting,
}

#[derive(Debug, Clone)]
pub enum InstanceKind {
    Host { tag: String },
    /// Text from a child list, rendered as a `span`.
    Text { text: String },
    Composite { class: Rc<ComponentClass> },
}

/// Tags whose nodes belong to the document itself.
pub const DOCUMENT_LEVEL_TAGS: &[&str] = &["html", "head", "body"];

#[derive(Debug)]
pub struct Instance {
    pub(crate) element: Element,
    pub(crate) props: ValueMap,
    pub(crate) state: ValueMap,
    pub(crate) kind: InstanceKind,
    pub(crate) mount_id: String,
    /// Slot name under the parent host (`""` for roots and rendered children).
    pub(crate) name: String,
    pub(crate) depth: usize,
    pub(crate) owner: Option<InstanceId>,
    pub(crate) refs: HashMap<String, InstanceId>,
    pub(crate) lifecycle: Lifecycle,
    /// Container this instance is the root of.
    pub(crate) container: Option<NodeKey>,
}

impl Instance {
    pub(crate) fn new(element: &Element, mount_id: String, name: String, depth: usize, owner: Option<InstanceId>) -> Self {
        let (kind, props) = match element.kind() {
            ElementType::Host(tag) => (InstanceKind::Host { tag: tag.clone() }, element.props().clone()),
            ElementType::Text(text) => (InstanceKind::Text { text: text.clone() }, ValueMap::new()),
            ElementType::Composite(class) => (
                InstanceKind::Composite {
                    class: Rc::clone(class),
                },
                class.resolve_props(element),
            ),
        };
        Self {
            element: element.clone(),
            props,
            state: ValueMap::new(),
            kind,
            mount_id,
            name,
            depth,
            owner,
            refs: HashMap::new(),
            lifecycle: Lifecycle::Mounting,
            container: None,
        }
    }

    pub const fn element(&self) -> &Element {
        &self.element
    }

    pub const fn props(&self) -> &ValueMap {
        &self.props
    }

    pub const fn state(&self) -> &ValueMap {
        &self.state
    }

    pub const fn kind(&self) -> &InstanceKind {
        &self.kind
    }

    pub fn mount_id(&self) -> &str {
        &self.mount_id
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn owner(&self) -> Option<InstanceId> {
        self.owner
    }

    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn refs(&self) -> &HashMap<String, InstanceId> {
        &self.refs
    }

    pub fn class(&self) -> Option<&Rc<ComponentClass>> {
        match &self.kind {
            InstanceKind::Composite { class } => Some(class),
            InstanceKind::Host { .. } | InstanceKind::Text { .. } => None,
        }
    }

    /// Tag, component name or `#text`.
    pub fn display_name(&self) -> &str {
        match &self.kind {
            InstanceKind::Host { tag } => tag,
            InstanceKind::Text { .. } => "#text",
            InstanceKind::Composite { class } => class.name(),
        }
    }

    pub fn is_document_level(&self) -> bool {
        matches!(&self.kind, InstanceKind::Host { tag } if DOCUMENT_LEVEL_TAGS.contains(&tag.as_str()))
    }
}
