use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Error;

use crate::dom::NodeKey;
use crate::markup::Markup;

/// Address of a node targeted by an update.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// A node by its stable key (containers).
    Key(NodeKey),
    /// A rendered element by its mount identifier.
    Mount(String),
}

impl NodeRef {
    pub fn mount(mount_id: impl Into<String>) -> Self {
        Self::Mount(mount_id.into())
    }
}

impl From<NodeKey> for NodeRef {
    fn from(key: NodeKey) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(formatter, "{key}"),
            Self::Mount(mount_id) => write!(formatter, "[{mount_id}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    /// Replace all children of `node` with `markup`. The only update counted
    /// as a full content write.
    SetContent { node: NodeRef, markup: Vec<Markup> },
    /// Remove all children of `node`.
    ClearContent { node: NodeRef },
    /// Materialize `markup` as the child at `index` of `parent`.
    InsertMarkup {
        parent: NodeRef,
        index: usize,
        markup: Markup,
    },
    /// Swap `node` and its subtree for `markup` in the same position.
    ReplaceNode { node: NodeRef, markup: Markup },
    /// Take `node` out of the tree, keeping it addressable for a later insert.
    DetachNode { node: NodeRef },
    /// Put a node back as the child at `index` of `parent`.
    InsertDetached {
        parent: NodeRef,
        node: NodeRef,
        index: usize,
    },
    RemoveNode { node: NodeRef },
    SetAttr {
        node: NodeRef,
        name: String,
        value: String,
    },
    RemoveAttr { node: NodeRef, name: String },
    /// Replace the children of `node` with a single text node.
    SetText { node: NodeRef, text: String },
}

pub trait DOMSubscriber {
    /// Apply a single update forwarded from the document.
    ///
    /// # Errors
    /// Implementations report updates they cannot apply.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error>;
}

/// Subscriber that records every update it receives. Clones share the log,
/// so one clone can be registered while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct MutationLog {
    updates: Rc<RefCell<Vec<DOMUpdate>>>,
}

impl MutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<DOMUpdate> {
        self.updates.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.updates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.updates.borrow_mut().clear();
    }

    /// Number of recorded updates matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DOMUpdate) -> bool) -> usize {
        self.updates.borrow().iter().filter(|update| predicate(update)).count()
    }
}

impl DOMSubscriber for MutationLog {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<(), Error> {
        self.updates.borrow_mut().push(update);
        Ok(())
    }
}
