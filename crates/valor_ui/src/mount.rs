//! Mounting and unmounting instance trees.
//!
//! Mounting builds instances top-down and returns the markup for the whole
//! subtree; nothing touches the document until the caller queues that markup.
//! Every rendered host node carries its mount id in [`MOUNT_ID_ATTR`], which
//! is how later updates address it.

use std::collections::BTreeMap;
use std::rc::Rc;

use html::checksum::{self, CHECKSUM_ATTR};
use html::{DOMUpdate, MOUNT_ID_ATTR, Markup, NodeKey, NodeRef};
use log::{debug, warn};
use tracing::debug_span;

use crate::batch::ReadyHook;
use crate::component::{Callback, ComponentClass, RenderScope, Scope};
use crate::element::{Element, ElementType, Owner};
use crate::error::UiError;
use crate::instance::{Instance, InstanceId, Lifecycle};
use crate::runtime::Ui;
use crate::value::{Value, ValueMap};

/// Numeric style properties written without a `px` suffix.
const UNITLESS_STYLES: &[&str] = &[
    "columnCount",
    "fillOpacity",
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "lineClamp",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "widows",
    "zIndex",
    "zoom",
];

impl Ui {
    pub(crate) fn render_root(
        &mut self,
        element: Element,
        target: NodeKey,
        callback: Option<Callback>,
    ) -> Result<InstanceId, UiError> {
        if !self.dom.contains(target) || !(self.dom.is_document(target) || self.dom.is_element(target)) {
            return Err(UiError::InvalidTarget(format!("{target} is not a container node")));
        }
        element.claim(Owner::TopLevel);
        if let Some(&root) = self.roots.get(&target) {
            let compatible = self
                .instance(root)
                .is_some_and(|instance| instance.element.can_update_to(&element));
            if compatible {
                debug!(target: "valor_ui::mount", "updating root {root} in {target}");
                return self.batched_updates(|ui| {
                    ui.batch.enqueue(root, |pending| {
                        pending.element = Some(element);
                        pending.callbacks.extend(callback);
                    });
                    Ok(root)
                });
            }
            self.unmount(target)?;
        }
        self.batched_updates(|ui| ui.mount_root(element, target, callback))
    }

    fn mount_root(
        &mut self,
        element: Element,
        target: NodeKey,
        callback: Option<Callback>,
    ) -> Result<InstanceId, UiError> {
        let span = debug_span!("mount_root", %target);
        let _guard = span.enter();

        let is_document = self.dom.is_document(target);
        let server_node = self
            .dom
            .first_element_child(target)
            .filter(|node| self.dom.attribute(*node, CHECKSUM_ATTR).is_some());
        if is_document && server_node.is_none() {
            return Err(UiError::MissingServerMarkup);
        }
        let adopted = server_node
            .and_then(|node| self.dom.attribute(node, MOUNT_ID_ATTR))
            .map(str::to_owned);
        let mount_id = match adopted {
            Some(mount_id) => mount_id,
            None => self.next_root_id(),
        };

        let (root, markup) = self.mount_element(&element, None, mount_id, String::new(), 0)?;
        if let Err(err) = self.attach_root(target, markup, server_node, is_document) {
            self.release(root, false);
            return Err(err);
        }
        if let Some(instance) = self.instance_mut(root) {
            instance.container = Some(target);
        }
        self.roots.insert(target, root);
        if let Some(callback) = callback {
            self.batch.push_callback(root, callback);
        }
        debug!(target: "valor_ui::mount", "mounted {} into {target}", element.display_name());
        Ok(root)
    }

    /// Queue the DOM update that puts a freshly mounted root's markup in place,
    /// or adopt matching server-rendered markup.
    fn attach_root(
        &mut self,
        target: NodeKey,
        markup: Markup,
        server_node: Option<NodeKey>,
        is_document: bool,
    ) -> Result<(), UiError> {
        if is_document {
            check_document_markup(&markup)?;
        }
        let Some(node) = server_node else {
            self.ops.push(DOMUpdate::SetContent {
                node: target.into(),
                markup: vec![markup],
            });
            return Ok(());
        };
        let existing = self.dom.to_markup(node);
        if existing.as_ref().is_some_and(|existing| checksum::can_reuse(existing, &markup)) {
            debug!(target: "valor_ui::mount", "reusing server markup in {target}");
            return Ok(());
        }
        let expected = existing
            .as_ref()
            .and_then(|existing| existing.attribute(CHECKSUM_ATTR))
            .and_then(|stored| stored.parse().ok())
            .unwrap_or_default();
        let actual = checksum::adler32(markup.to_html().as_bytes());
        if is_document || self.config.strict_hydration {
            return Err(UiError::ChecksumMismatch { expected, actual });
        }
        warn!(
            target: "valor_ui::mount",
            "server markup in {target} does not match the client render ({expected} != {actual}); replacing it"
        );
        self.ops.push(DOMUpdate::SetContent {
            node: target.into(),
            markup: vec![markup],
        });
        Ok(())
    }

    /// Create the instance for `element` under `parent` and everything it
    /// renders, returning the subtree's markup.
    pub(crate) fn mount_element(
        &mut self,
        element: &Element,
        parent: Option<InstanceId>,
        mount_id: String,
        name: String,
        depth: usize,
    ) -> Result<(InstanceId, Markup), UiError> {
        let owner = match element.owner() {
            Owner::Instance(owner) => Some(owner),
            Owner::TopLevel | Owner::Unclaimed => None,
        };
        if let Some(ref_name) = element.ref_name()
            && owner.is_none()
        {
            return Err(UiError::RefOwnershipViolation(format!(
                "ref \"{ref_name}\" on {} was declared outside of any component's render",
                element.display_name()
            )));
        }

        let id = self.new_instance(Instance::new(element, mount_id, name, depth, owner), parent)?;
        if let (Some(owner), Some(ref_name)) = (owner, element.ref_name())
            && let Some(owner) = self.instance_mut(owner)
        {
            owner.refs.insert(ref_name.to_owned(), id);
        }

        let built = match element.kind() {
            ElementType::Host(tag) => self.mount_host(id, tag, element),
            ElementType::Text(text) => Ok(text_markup(self.mount_id(id).unwrap_or_default(), text)),
            ElementType::Composite(class) => self.mount_composite(id, class),
        };
        match built {
            Ok(markup) => {
                if let Some(instance) = self.instance_mut(id) {
                    instance.lifecycle = Lifecycle::Mounted;
                }
                self.counters.mounts += 1;
                Ok((id, markup))
            }
            Err(err) => {
                self.release(id, false);
                Err(err)
            }
        }
    }

    fn mount_host(&mut self, id: InstanceId, tag: &str, element: &Element) -> Result<Markup, UiError> {
        let (mount_id, depth) = self.position(id);
        let mut markup = Markup::element(tag).with_attr(MOUNT_ID_ATTR, &mount_id);
        for (name, value) in host_attributes(element.props()) {
            markup.set_attr(&name, &value);
        }
        if let Some(text) = element.children().inline_text() {
            if !text.is_empty() {
                markup.push_child(Markup::text(text));
            }
            return Ok(markup);
        }
        for (name, child) in element.children().named() {
            let child_id = format!("{mount_id}.{name}");
            let (_, child_markup) = self.mount_element(&child, Some(id), child_id, name, depth + 1)?;
            markup.push_child(child_markup);
        }
        Ok(markup)
    }

    fn mount_composite(&mut self, id: InstanceId, class: &Rc<ComponentClass>) -> Result<Markup, UiError> {
        let state = class.initial_state(self.props_or_empty(id));
        if let Some(instance) = self.instance_mut(id) {
            instance.state = state;
        }
        if let Some(will_mount) = class.hooks().will_mount.get() {
            will_mount(&mut Scope::new(self, id));
        }
        let rendered = self.render_instance(id, class)?;
        let (mount_id, depth) = self.position(id);
        let (_, markup) = self.mount_element(&rendered, Some(id), mount_id, String::new(), depth + 1)?;
        if !self.server {
            self.batch.push_ready(ReadyHook::DidMount(id));
        }
        Ok(markup)
    }

    /// Run `id`'s render function and claim what it returns.
    pub(crate) fn render_instance(&self, id: InstanceId, class: &ComponentClass) -> Result<Element, UiError> {
        let render = class.render_fn();
        let element = render(&RenderScope::new(self, id))?;
        element.claim(Owner::Instance(id));
        Ok(element)
    }

    pub(crate) fn position(&self, id: InstanceId) -> (String, usize) {
        self.instance(id)
            .map(|instance| (instance.mount_id.clone(), instance.depth))
            .unwrap_or_default()
    }

    /// Unmount the tree rendered into `target`. Returns whether anything was
    /// mounted there.
    ///
    /// # Errors
    /// [`UiError::UnmountForbidden`] if the tree renders document-level nodes.
    pub fn unmount(&mut self, target: NodeKey) -> Result<bool, UiError> {
        let Some(&root) = self.roots.get(&target) else {
            return Ok(false);
        };
        self.ensure_unmountable(root)?;
        self.batched_updates(|ui| {
            debug!(target: "valor_ui::mount", "unmounting {root} from {target}");
            ui.release(root, true);
            ui.roots.remove(&target);
            ui.ops.push(DOMUpdate::ClearContent { node: target.into() });
            Ok(true)
        })
    }

    /// Refuse to remove document-level nodes (`html`, `head`, `body`).
    pub(crate) fn ensure_unmountable(&self, id: InstanceId) -> Result<(), UiError> {
        if self.instance(id).is_none() {
            return Ok(());
        }
        for node in id.node().descendants(&self.instances) {
            if let Some(instance) = self.instance(InstanceId::from(node))
                && instance.is_document_level()
            {
                return Err(UiError::UnmountForbidden(format!(
                    "<{}> ({}) is part of the document and cannot be removed",
                    instance.display_name(),
                    instance.mount_id
                )));
            }
        }
        Ok(())
    }

    /// Remove the instance tree under `id`. With `run_hooks`, will-unmount
    /// runs parent first and the removal is counted as an unmount.
    pub(crate) fn release(&mut self, id: InstanceId, run_hooks: bool) {
        if self.instance(id).is_none() {
            return;
        }
        self.teardown(id, run_hooks);
        if !id.node().is_removed(&self.instances) {
            id.node().remove_subtree(&mut self.instances);
        }
    }

    fn teardown(&mut self, id: InstanceId, run_hooks: bool) {
        let Some(instance) = self.instance_mut(id) else {
            return;
        };
        instance.lifecycle = Lifecycle::Unmounting;
        if run_hooks {
            let will_unmount = instance
                .class()
                .and_then(|class| class.hooks().will_unmount.get());
            if let Some(will_unmount) = will_unmount {
                will_unmount(&mut Scope::new(self, id));
            }
        }
        let children: Vec<InstanceId> = self.children(id);
        for child in children {
            self.teardown(child, run_hooks);
        }
        self.detach_ref(id);
        self.batch.drop_instance(id);
        if let Some(instance) = self.instance_mut(id) {
            instance.refs.clear();
        }
        if run_hooks {
            self.counters.unmounts += 1;
        }
    }

    fn detach_ref(&mut self, id: InstanceId) {
        let Some(instance) = self.instance(id) else {
            return;
        };
        let (Some(owner), Some(ref_name)) = (instance.owner, instance.element.ref_name().map(str::to_owned))
        else {
            return;
        };
        if let Some(owner) = self.instance_mut(owner)
            && owner.refs.get(&ref_name) == Some(&id)
        {
            owner.refs.remove(&ref_name);
        }
    }
}

fn check_document_markup(markup: &Markup) -> Result<(), UiError> {
    let children: Vec<&str> = markup
        .children()
        .iter()
        .filter_map(Markup::tag)
        .collect();
    if markup.tag() == Some("html") && children == ["head", "body"] {
        Ok(())
    } else {
        Err(UiError::InvalidDocumentRoot(format!(
            "expected <html> with <head> and <body>, got <{}> with {children:?}",
            markup.tag().unwrap_or("#text")
        )))
    }
}

fn text_markup(mount_id: &str, text: &str) -> Markup {
    Markup::element("span")
        .with_attr(MOUNT_ID_ATTR, mount_id)
        .with_child(Markup::text(text))
}

/// Document attributes for a host element's props, by attribute name.
pub(crate) fn host_attributes(props: &ValueMap) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for (name, value) in props {
        let attribute = match name.as_str() {
            "children" | "key" | "ref" => continue,
            "className" => "class",
            "htmlFor" => "for",
            other => other,
        };
        let text = match value {
            Value::Null | Value::Bool(false) => continue,
            Value::Bool(true) => String::new(),
            Value::Map(style) if name == "style" => match style_text(style) {
                Some(text) => text,
                None => continue,
            },
            Value::Element(element) => {
                warn!(
                    target: "valor_ui::mount",
                    "prop {name} holds element {} and is not rendered as an attribute",
                    element.display_name()
                );
                continue;
            }
            Value::Map(_) => continue,
            Value::Number(_) | Value::Text(_) => value.to_text().unwrap_or_default(),
        };
        attributes.insert(attribute.to_owned(), text);
    }
    attributes
}

fn style_text(style: &ValueMap) -> Option<String> {
    let mut text = String::new();
    for (name, value) in style {
        let rendered = match value {
            Value::Number(number) if *number != 0.0 && !UNITLESS_STYLES.contains(&name.as_str()) => {
                format!("{number}px")
            }
            _ => match value.to_text() {
                Some(rendered) if !rendered.is_empty() => rendered,
                _ => continue,
            },
        };
        text.push_str(&hyphenate(name));
        text.push(':');
        text.push_str(&rendered);
        text.push(';');
    }
    (!text.is_empty()).then_some(text)
}

fn hyphenate(name: &str) -> String {
    let mut hyphenated = String::with_capacity(name.len() + 2);
    for character in name.chars() {
        if character.is_ascii_uppercase() {
            hyphenated.push('-');
            hyphenated.push(character.to_ascii_lowercase());
        } else {
            hyphenated.push(character);
        }
    }
    hyphenated
}

/// `NodeRef` for the document node of the instance mounted at `mount_id`.
pub(crate) fn node_ref(mount_id: &str) -> NodeRef {
    NodeRef::Mount(mount_id.to_owned())
}
