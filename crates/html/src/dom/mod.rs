//! Arena-backed host document.
//!
//! The [`DOM`] is the target container a component tree renders into. It is
//! mutated only through batches of [`DOMUpdate`]s (see [`DOM::apply_batch`]),
//! each of which is forwarded to registered [`DOMSubscriber`] mirrors once the
//! document itself has applied it. Nodes are addressed by a stable
//! [`NodeKey`] or, for rendered elements, by their mount identifier attribute.

use core::{fmt, mem};
use std::collections::HashMap;

use anyhow::{Error, anyhow};
use indextree::{Arena, Node, NodeId};
use log::{debug, trace};
use smallvec::SmallVec;

use crate::markup::{self, Markup};
use crate::parser::{parse_document_markup, parse_fragment_markup};

pub mod printing;
pub mod updating;

pub use updating::{DOMSubscriber, DOMUpdate, MutationLog, NodeRef};

/// Attribute carrying a rendered element's mount identifier.
pub const MOUNT_ID_ATTR: &str = "data-valorid";

/// A 64-bit stable key for document nodes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node (always present).
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::ROOT
    }
}

pub struct DOM {
    dom: Arena<DOMNode>,
    root: NodeId,
    keys: HashMap<NodeKey, NodeId>,
    /// Mount identifier -> element carrying it.
    mounted: HashMap<String, NodeId>,
    next_key: u64,
    content_writes: usize,
    subscribers: Vec<Box<dyn DOMSubscriber>>,
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl DOM {
    /// Create an empty document.
    pub fn new() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        let mut keys = HashMap::new();
        keys.insert(NodeKey::ROOT, root);
        Self {
            dom,
            root,
            keys,
            mounted: HashMap::new(),
            next_key: 1,
            content_writes: 0,
            subscribers: Vec::new(),
        }
    }

    /// Create a document from a complete HTML source.
    ///
    /// # Errors
    /// Returns an error if the parsed tree cannot be attached.
    pub fn from_markup(html: &str) -> Result<Self, Error> {
        let mut dom = Self::new();
        dom.load_markup(NodeKey::ROOT, html)?;
        Ok(dom)
    }

    /// Replace the content of `node` with parsed HTML. The document node takes
    /// a complete document, any other element takes a fragment.
    ///
    /// Loading is how pre-existing (e.g. server-rendered) content arrives; it
    /// is not counted as a content write and is not forwarded to subscribers.
    ///
    /// # Errors
    /// Returns an error if `node` does not exist or is a text node.
    pub fn load_markup(&mut self, node: NodeKey, html: &str) -> Result<(), Error> {
        let id = self.resolve_key(node)?;
        let nodes = if self.is_document(node) {
            parse_document_markup(html)
        } else {
            parse_fragment_markup(html)
        };
        self.replace_children(id, &nodes)?;
        debug!(target: "html::dom", "loaded {} top-level nodes into {node}", nodes.len());
        Ok(())
    }

    /// Create a detached element, e.g. a container to render into.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        let id = self.alloc(
            NodeKind::Element {
                tag: tag.to_owned(),
            },
            SmallVec::new(),
        );
        self.key_of(id)
    }

    /// Append `child` (detaching it first) as the last child of `parent`.
    ///
    /// # Errors
    /// Returns an error if either node is unknown or `child` is an ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), Error> {
        let parent = self.resolve_key(parent)?;
        let child = self.resolve_key(child)?;
        child.detach(&mut self.dom);
        parent
            .checked_append(child, &mut self.dom)
            .map_err(|err| anyhow!("cannot append node: {err:?}"))
    }

    /// Register a mirror that receives every applied batch.
    pub fn subscribe(&mut self, subscriber: Box<dyn DOMSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Apply a batch of updates in order, then forward it to subscribers.
    ///
    /// # Errors
    /// Returns the first update or subscriber failure. Updates before the
    /// failing one remain applied.
    pub fn apply_batch(&mut self, updates: Vec<DOMUpdate>) -> Result<(), Error> {
        if updates.is_empty() {
            return Ok(());
        }
        debug!(target: "html::dom", "applying batch of {} updates", updates.len());
        for update in &updates {
            self.apply(update)?;
        }
        for subscriber in &mut self.subscribers {
            for update in updates.iter().cloned() {
                subscriber.apply_update(update)?;
            }
        }
        Ok(())
    }

    /// Apply a single update without forwarding it.
    ///
    /// # Errors
    /// Returns an error if a referenced node is unknown or the tree edit is invalid.
    pub fn apply(&mut self, update: &DOMUpdate) -> Result<(), Error> {
        trace!(target: "html::dom", "{update:?}");
        match update {
            DOMUpdate::SetContent { node, markup } => {
                let id = self.resolve(node)?;
                self.replace_children(id, markup)?;
                self.content_writes += 1;
            }
            DOMUpdate::ClearContent { node } => {
                let id = self.resolve(node)?;
                self.replace_children(id, &[])?;
            }
            DOMUpdate::InsertMarkup {
                parent,
                index,
                markup,
            } => {
                let parent = self.resolve(parent)?;
                let child = self.materialize(markup)?;
                self.insert_at(parent, *index, child)?;
            }
            DOMUpdate::ReplaceNode { node, markup } => {
                let old = self.resolve(node)?;
                let new = self.materialize(markup)?;
                old.checked_insert_before(new, &mut self.dom)
                    .map_err(|err| anyhow!("cannot replace {node}: {err:?}"))?;
                self.remove_subtree(old);
            }
            DOMUpdate::DetachNode { node } => {
                let id = self.resolve(node)?;
                id.detach(&mut self.dom);
            }
            DOMUpdate::InsertDetached {
                parent,
                node,
                index,
            } => {
                let parent = self.resolve(parent)?;
                let id = self.resolve(node)?;
                id.detach(&mut self.dom);
                self.insert_at(parent, *index, id)?;
            }
            DOMUpdate::RemoveNode { node } => {
                let id = self.resolve(node)?;
                self.remove_subtree(id);
            }
            DOMUpdate::SetAttr { node, name, value } => {
                let id = self.resolve(node)?;
                self.set_attr(id, name, value)?;
            }
            DOMUpdate::RemoveAttr { node, name } => {
                let id = self.resolve(node)?;
                self.remove_attr(id, name)?;
            }
            DOMUpdate::SetText { node, text } => {
                let id = self.resolve(node)?;
                let content = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Markup::text(text.as_str())]
                };
                self.replace_children(id, &content)?;
            }
        }
        Ok(())
    }

    /// Number of full content replacements (`SetContent`) applied so far.
    pub fn content_writes(&self) -> usize {
        self.content_writes
    }

    pub fn root(&self) -> NodeKey {
        NodeKey::ROOT
    }

    pub fn contains(&self, node: NodeKey) -> bool {
        self.keys.contains_key(&node)
    }

    pub fn node(&self, node: NodeKey) -> Option<&DOMNode> {
        let id = self.keys.get(&node)?;
        self.dom.get(*id).map(Node::get)
    }

    pub fn is_document(&self, node: NodeKey) -> bool {
        matches!(self.node(node), Some(DOMNode { kind: NodeKind::Document, .. }))
    }

    pub fn is_element(&self, node: NodeKey) -> bool {
        matches!(self.node(node), Some(DOMNode { kind: NodeKind::Element { .. }, .. }))
    }

    pub fn tag(&self, node: NodeKey) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.keys.get(&node)?;
        id.parent(&self.dom).map(|parent| self.key_of(parent))
    }

    pub fn children(&self, node: NodeKey) -> Vec<NodeKey> {
        self.keys.get(&node).map_or_else(Vec::new, |id| {
            id.children(&self.dom)
                .map(|child| self.key_of(child))
                .collect()
        })
    }

    pub fn first_element_child(&self, node: NodeKey) -> Option<NodeKey> {
        self.children(node)
            .into_iter()
            .find(|child| self.is_element(*child))
    }

    pub fn attribute(&self, node: NodeKey, name: &str) -> Option<&str> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// Element currently carrying mount identifier `mount_id`.
    pub fn find_by_mount_id(&self, mount_id: &str) -> Option<NodeKey> {
        self.mounted.get(mount_id).map(|id| self.key_of(*id))
    }

    /// First element with `tag` in document order.
    pub fn find_element(&self, tag: &str) -> Option<NodeKey> {
        self.root
            .descendants(&self.dom)
            .find(|id| {
                matches!(
                    self.dom.get(*id).map(|node| &node.get().kind),
                    Some(NodeKind::Element { tag: node_tag }) if node_tag == tag
                )
            })
            .map(|id| self.key_of(id))
    }

    /// Snapshot of `node` and its subtree as markup. `None` for the document.
    pub fn to_markup(&self, node: NodeKey) -> Option<Markup> {
        let id = self.keys.get(&node)?;
        self.markup_of(*id)
    }

    pub fn inner_html(&self, node: NodeKey) -> String {
        let Some(id) = self.keys.get(&node) else {
            return String::new();
        };
        let children: Vec<Markup> = id
            .children(&self.dom)
            .filter_map(|child| self.markup_of(child))
            .collect();
        markup::to_html(&children)
    }

    pub fn outer_html(&self, node: NodeKey) -> String {
        if self.is_document(node) {
            return self.inner_html(node);
        }
        self.to_markup(node)
            .map(|markup| markup.to_html())
            .unwrap_or_default()
    }

    pub fn text_content(&self, node: NodeKey) -> String {
        let Some(id) = self.keys.get(&node) else {
            return String::new();
        };
        id.descendants(&self.dom)
            .filter_map(|desc| match &self.dom.get(desc)?.get().kind {
                NodeKind::Text { text } => Some(text.as_str()),
                NodeKind::Document | NodeKind::Element { .. } => None,
            })
            .collect()
    }

    fn key_of(&self, id: NodeId) -> NodeKey {
        self.dom
            .get(id)
            .map_or(NodeKey::ROOT, |node| node.get().key)
    }

    fn resolve_key(&self, node: NodeKey) -> Result<NodeId, Error> {
        self.keys
            .get(&node)
            .copied()
            .ok_or_else(|| anyhow!("unknown node {node}"))
    }

    fn resolve(&self, node: &NodeRef) -> Result<NodeId, Error> {
        match node {
            NodeRef::Key(key) => self.resolve_key(*key),
            NodeRef::Mount(mount_id) => self
                .mounted
                .get(mount_id)
                .copied()
                .ok_or_else(|| anyhow!("no element with mount id {mount_id}")),
        }
    }

    fn alloc(&mut self, kind: NodeKind, attrs: SmallVec<(String, String), 4>) -> NodeId {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        let id = self.dom.new_node(DOMNode { key, kind, attrs });
        self.keys.insert(key, id);
        id
    }

    fn materialize(&mut self, markup: &Markup) -> Result<NodeId, Error> {
        match markup {
            Markup::Text(text) => Ok(self.alloc(NodeKind::Text { text: text.clone() }, SmallVec::new())),
            Markup::Element {
                tag,
                attrs,
                children,
            } => {
                let id = self.alloc(NodeKind::Element { tag: tag.clone() }, attrs.clone());
                if let Some((_, mount_id)) = attrs.iter().find(|(name, _)| name == MOUNT_ID_ATTR) {
                    self.mounted.insert(mount_id.clone(), id);
                }
                for child in children {
                    let child = self.materialize(child)?;
                    id.checked_append(child, &mut self.dom)
                        .map_err(|err| anyhow!("cannot attach markup: {err:?}"))?;
                }
                Ok(id)
            }
        }
    }

    fn markup_of(&self, id: NodeId) -> Option<Markup> {
        let node = self.dom.get(id)?.get();
        match &node.kind {
            NodeKind::Document => None,
            NodeKind::Text { text } => Some(Markup::text(text.as_str())),
            NodeKind::Element { tag } => Some(Markup::Element {
                tag: tag.clone(),
                attrs: node.attrs.clone(),
                children: id
                    .children(&self.dom)
                    .filter_map(|child| self.markup_of(child))
                    .collect(),
            }),
        }
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), Error> {
        let result = match parent.children(&self.dom).nth(index) {
            Some(sibling) => sibling.checked_insert_before(child, &mut self.dom),
            None => parent.checked_append(child, &mut self.dom),
        };
        result.map_err(|err| anyhow!("cannot insert node at {index}: {err:?}"))
    }

    fn replace_children(&mut self, id: NodeId, nodes: &[Markup]) -> Result<(), Error> {
        if matches!(self.dom.get(id).map(|node| &node.get().kind), Some(NodeKind::Text { .. })) {
            return Err(anyhow!("text nodes have no content to replace"));
        }
        let old: Vec<NodeId> = id.children(&self.dom).collect();
        for child in old {
            self.remove_subtree(child);
        }
        for markup in nodes {
            let child = self.materialize(markup)?;
            id.checked_append(child, &mut self.dom)
                .map_err(|err| anyhow!("cannot attach markup: {err:?}"))?;
        }
        Ok(())
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let subtree: Vec<NodeId> = id.descendants(&self.dom).collect();
        for desc in subtree {
            let Some(node) = self.dom.get(desc).map(Node::get) else {
                continue;
            };
            self.keys.remove(&node.key);
            if let Some((_, mount_id)) = node.attrs.iter().find(|(name, _)| name == MOUNT_ID_ATTR)
                && self.mounted.get(mount_id) == Some(&desc)
            {
                self.mounted.remove(mount_id);
            }
        }
        id.remove_subtree(&mut self.dom);
    }

    fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), Error> {
        let node = self
            .dom
            .get_mut(id)
            .ok_or_else(|| anyhow!("node was removed"))?
            .get_mut();
        let previous = if let Some(slot) = node.attrs.iter_mut().find(|(attr, _)| attr == name) {
            Some(mem::replace(&mut slot.1, value.to_owned()))
        } else {
            node.attrs.push((name.to_owned(), value.to_owned()));
            None
        };
        if name == MOUNT_ID_ATTR {
            if let Some(previous) = previous
                && self.mounted.get(&previous) == Some(&id)
            {
                self.mounted.remove(&previous);
            }
            self.mounted.insert(value.to_owned(), id);
        }
        Ok(())
    }

    fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), Error> {
        let node = self
            .dom
            .get_mut(id)
            .ok_or_else(|| anyhow!("node was removed"))?
            .get_mut();
        let Some(position) = node.attrs.iter().position(|(attr, _)| attr == name) else {
            return Ok(());
        };
        let (_, previous) = node.attrs.remove(position);
        if name == MOUNT_ID_ATTR && self.mounted.get(&previous) == Some(&id) {
            self.mounted.remove(&previous);
        }
        Ok(())
    }
}

impl DOMSubscriber for DOM {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        self.apply(&update)
    }
}
