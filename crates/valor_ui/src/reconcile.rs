//! Updating mounted instances in place.
//!
//! An instance receiving a new element updates itself and recurses into what
//! it renders; an element that cannot update the current instance (different
//! type, key or owner) replaces it. Receiving the exact element an instance
//! already holds is a no-op, which stops re-rendering at children passed in
//! through props.
//!
//! A failed update leaves the instance tree as it was: composites restore
//! their previous element, props and state, hosts keep their previous element,
//! and fresh children are released before removed ones would be.

use core::mem;

use html::DOMUpdate;
use log::trace;

use crate::batch::{PendingUpdate, ReadyHook};
use crate::component::{Scope, UpdateArgs};
use crate::diff::{ChildDiff, ChildStep, diff_children};
use crate::element::{Element, ElementType, Owner};
use crate::error::UiError;
use crate::instance::{InstanceId, InstanceKind};
use crate::mount::{host_attributes, node_ref};
use crate::runtime::Ui;
use crate::value::merge_into;

impl Ui {
    /// Process the pending update of a dirty instance.
    pub(crate) fn update_instance(&mut self, id: InstanceId) -> Result<(), UiError> {
        let Some(instance) = self.instance(id) else {
            self.batch.drop_instance(id);
            return Ok(());
        };
        if instance.class().is_some() {
            return self.update_composite(id, None);
        }
        let Some(pending) = self.batch.take_pending(id) else {
            return Ok(());
        };
        for callback in pending.callbacks {
            self.batch.push_callback(id, callback);
        }
        match pending.element {
            Some(element) => self.receive(id, element),
            None => Ok(()),
        }
    }

    /// Reconcile `id` against `next`. An element some instance rendered and
    /// that `id` already holds is skipped; top-level elements always update.
    pub(crate) fn receive(&mut self, id: InstanceId, next: Element) -> Result<(), UiError> {
        let Some(instance) = self.instance(id) else {
            return Ok(());
        };
        if matches!(next.owner(), Owner::Instance(_)) && instance.element.ptr_eq(&next) {
            trace!(target: "valor_ui::reconcile", "{id} received its own element; skipping");
            return Ok(());
        }
        match instance.kind {
            InstanceKind::Composite { .. } => self.update_composite(id, Some(next)),
            InstanceKind::Host { .. } => self.update_host(id, next),
            InstanceKind::Text { .. } => {
                self.update_text(id, next);
                Ok(())
            }
        }
    }

    /// Update a composite from `next` (an owner re-render) or its own pending
    /// update, merging any queued state first.
    fn update_composite(&mut self, id: InstanceId, next: Option<Element>) -> Result<(), UiError> {
        let Some(instance) = self.instance(id) else {
            return Ok(());
        };
        let Some(class) = instance.class().cloned() else {
            return Ok(());
        };
        let current = instance.element.clone();
        let mut pending = self.batch.take_pending(id).unwrap_or_default();
        let next_element = next
            .or_else(|| pending.element.take())
            .unwrap_or_else(|| current.clone());

        let element_changed = !next_element.ptr_eq(&current);
        let next_props = if element_changed {
            class.resolve_props(&next_element)
        } else {
            self.props_or_empty(id).clone()
        };
        if element_changed && let Some(will_receive_props) = class.hooks().will_receive_props.get() {
            will_receive_props(&mut Scope::new(self, id), &next_props);
            // State set from the hook joins this update.
            if let Some(queued) = self.batch.take_pending(id) {
                absorb(&mut pending, queued);
            }
        }
        for callback in mem::take(&mut pending.callbacks) {
            self.batch.push_callback(id, callback);
        }

        let mut next_state = self.state_or_empty(id).clone();
        if let Some(partial) = &pending.state {
            merge_into(&mut next_state, partial);
        }
        let should_update = pending.force
            || class.hooks().should_update.get().is_none_or(|guard| {
                guard(&UpdateArgs {
                    props: self.props_or_empty(id),
                    state: self.state_or_empty(id),
                    next_props: &next_props,
                    next_state: &next_state,
                })
            });
        if !should_update {
            trace!(target: "valor_ui::reconcile", "{id} ({}) skipped by its guard", class.name());
            self.update_ref(id, &current, &next_element);
            if let Some(instance) = self.instance_mut(id) {
                instance.element = next_element;
                instance.props = next_props;
                instance.state = next_state;
            }
            return Ok(());
        }

        if let Some(will_update) = class.hooks().will_update.get() {
            will_update(&mut Scope::new(self, id), &next_props, &next_state);
        }
        self.update_ref(id, &current, &next_element);
        let Some(instance) = self.instance_mut(id) else {
            return Ok(());
        };
        instance.element = next_element;
        let prev_props = mem::replace(&mut instance.props, next_props);
        let prev_state = mem::replace(&mut instance.state, next_state);

        let outcome = self
            .render_instance(id, &class)
            .and_then(|rendered| self.reconcile_rendered(id, rendered));
        if let Err(err) = outcome {
            let restored = current.clone();
            if let Some(instance) = self.instance_mut(id) {
                let attempted = mem::replace(&mut instance.element, current);
                instance.props = prev_props;
                instance.state = prev_state;
                self.update_ref(id, &attempted, &restored);
            }
            return Err(err);
        }
        self.batch.push_ready(ReadyHook::DidUpdate {
            id,
            prev_props,
            prev_state,
        });
        self.counters.updates += 1;
        Ok(())
    }

    /// Update a composite's rendered child, or replace it when `rendered`
    /// cannot update it.
    fn reconcile_rendered(&mut self, id: InstanceId, rendered: Element) -> Result<(), UiError> {
        let Some(child) = self.rendered_child(id) else {
            return Ok(());
        };
        let compatible = self
            .instance(child)
            .is_some_and(|instance| instance.element.can_update_to(&rendered));
        if compatible {
            return self.receive(child, rendered);
        }
        self.ensure_unmountable(child)?;
        let Some(instance) = self.instance(child) else {
            return Ok(());
        };
        let (mount_id, depth) = (instance.mount_id.clone(), instance.depth);
        trace!(
            target: "valor_ui::reconcile",
            "{id} replaces {} with {}",
            instance.display_name(),
            rendered.display_name()
        );
        let (_, markup) = self.mount_element(&rendered, Some(id), mount_id.clone(), String::new(), depth)?;
        self.release(child, true);
        self.ops.push(DOMUpdate::ReplaceNode {
            node: node_ref(&mount_id),
            markup,
        });
        Ok(())
    }

    fn update_text(&mut self, id: InstanceId, next: Element) {
        let Some(instance) = self.instance_mut(id) else {
            return;
        };
        let text = match next.kind() {
            ElementType::Text(text) => text.clone(),
            _ => return,
        };
        let changed = !matches!(&instance.kind, InstanceKind::Text { text: current } if *current == text);
        instance.element = next;
        if changed {
            instance.kind = InstanceKind::Text { text: text.clone() };
            let node = node_ref(&instance.mount_id);
            self.ops.push(DOMUpdate::SetText { node, text });
        }
    }

    fn update_host(&mut self, id: InstanceId, next: Element) -> Result<(), UiError> {
        let Some(instance) = self.instance(id) else {
            return Ok(());
        };
        let prev = instance.element.clone();
        let node = node_ref(&instance.mount_id);

        let prev_attributes = host_attributes(prev.props());
        let next_attributes = host_attributes(next.props());
        for (name, value) in &next_attributes {
            if prev_attributes.get(name) != Some(value) {
                self.ops.push(DOMUpdate::SetAttr {
                    node: node.clone(),
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
        for name in prev_attributes.keys() {
            if !next_attributes.contains_key(name) {
                self.ops.push(DOMUpdate::RemoveAttr {
                    node: node.clone(),
                    name: name.clone(),
                });
            }
        }

        let prev_text = prev.children().inline_text();
        match next.children().inline_text() {
            Some(text) => {
                let children = self.children(id);
                for child in &children {
                    self.ensure_unmountable(*child)?;
                }
                for child in &children {
                    self.release(*child, true);
                }
                if prev_text != Some(text) || !children.is_empty() {
                    self.ops.push(DOMUpdate::SetText {
                        node,
                        text: text.to_owned(),
                    });
                }
            }
            None => {
                if prev_text.is_some_and(|text| !text.is_empty()) {
                    self.ops.push(DOMUpdate::SetText {
                        node,
                        text: String::new(),
                    });
                }
                self.update_children(id, next.children().named())?;
            }
        }

        self.update_ref(id, &prev, &next);
        if let Some(instance) = self.instance_mut(id) {
            instance.props = next.props().clone();
            instance.element = next;
        }
        self.counters.updates += 1;
        Ok(())
    }

    /// Transition a host's child instances to `next`, emitting the minimal
    /// DOM updates. Removed and moved nodes are taken out first, then the
    /// next list is placed in order so every insertion index is final.
    /// Removed instances are released only once the whole list is placed.
    fn update_children(&mut self, id: InstanceId, next: Vec<(String, Element)>) -> Result<(), UiError> {
        let prev: Vec<(String, InstanceId)> = self
            .children(id)
            .into_iter()
            .filter_map(|child| Some((self.instance(child)?.name.clone(), child)))
            .collect();
        let prev_names: Vec<&str> = prev.iter().map(|(name, _)| name.as_str()).collect();
        let next_names: Vec<&str> = next.iter().map(|(name, _)| name.as_str()).collect();
        let diff = diff_children(&prev_names, &next_names, |prev_index, next_index| {
            self.instance(prev[prev_index].1)
                .is_some_and(|child| child.element.can_update_to(&next[next_index].1))
        });
        let prev: Vec<InstanceId> = prev.into_iter().map(|(_, child)| child).collect();

        let removed: Vec<InstanceId> = diff.removals.iter().map(|&index| prev[index]).collect();
        for &child in &removed {
            self.ensure_unmountable(child)?;
        }
        for &child in &removed {
            if let Some(child_mount_id) = self.mount_id(child) {
                let node = node_ref(child_mount_id);
                self.ops.push(DOMUpdate::RemoveNode { node });
            }
        }

        let mut fresh = Vec::new();
        match self.place_children(id, diff, &prev, next, &mut fresh) {
            Ok(ordered) => {
                for child in removed {
                    self.release(child, true);
                }
                self.reorder_children(id, &ordered)
            }
            Err(err) => {
                for child in fresh {
                    self.release(child, false);
                }
                Err(err)
            }
        }
    }

    /// Receive reused children and mount fresh ones in next order, returning
    /// the resulting child list. Fresh instances are pushed to `fresh` as
    /// soon as they exist.
    fn place_children(
        &mut self,
        id: InstanceId,
        diff: ChildDiff,
        prev: &[InstanceId],
        next: Vec<(String, Element)>,
        fresh: &mut Vec<InstanceId>,
    ) -> Result<Vec<InstanceId>, UiError> {
        let (mount_id, depth) = self.position(id);
        let parent = node_ref(&mount_id);

        if diff.all_fresh() && !next.is_empty() && next.len() >= self.config.bulk_threshold {
            let mut markup = Vec::with_capacity(next.len());
            for (name, element) in next {
                let child_id = format!("{mount_id}.{name}");
                let (child, child_markup) = self.mount_element(&element, Some(id), child_id, name, depth + 1)?;
                fresh.push(child);
                markup.push(child_markup);
            }
            trace!(target: "valor_ui::reconcile", "{id} writes {} children at once", markup.len());
            self.ops.push(DOMUpdate::SetContent { node: parent, markup });
            return Ok(fresh.clone());
        }

        for step in &diff.steps {
            if let ChildStep::Reuse { prev: index, moved: true } = step
                && let Some(child_mount_id) = self.mount_id(prev[*index])
            {
                let node = node_ref(child_mount_id);
                self.ops.push(DOMUpdate::DetachNode { node });
            }
        }

        let mut ordered = Vec::with_capacity(next.len());
        for (index, ((name, element), step)) in next.into_iter().zip(diff.steps).enumerate() {
            match step {
                ChildStep::Reuse { prev: prev_index, moved } => {
                    let child = prev[prev_index];
                    self.receive(child, element)?;
                    if moved && let Some(child_mount_id) = self.mount_id(child) {
                        let node = node_ref(child_mount_id);
                        self.ops.push(DOMUpdate::InsertDetached {
                            parent: parent.clone(),
                            node,
                            index,
                        });
                    }
                    ordered.push(child);
                }
                ChildStep::Insert => {
                    let child_id = format!("{mount_id}.{name}");
                    let (child, markup) = self.mount_element(&element, Some(id), child_id, name, depth + 1)?;
                    fresh.push(child);
                    self.ops.push(DOMUpdate::InsertMarkup {
                        parent: parent.clone(),
                        index,
                        markup,
                    });
                    ordered.push(child);
                }
            }
        }
        Ok(ordered)
    }

    /// Make the arena order of `id`'s children match `ordered`.
    fn reorder_children(&mut self, id: InstanceId, ordered: &[InstanceId]) -> Result<(), UiError> {
        for child in ordered {
            child.node().detach(&mut self.instances);
            id.node()
                .checked_append(child.node(), &mut self.instances)
                .map_err(|err| UiError::Host(anyhow::anyhow!("cannot reorder instance: {err:?}")))?;
        }
        Ok(())
    }

    /// Move the owner's ref entry when an update renames or drops the ref.
    fn update_ref(&mut self, id: InstanceId, prev: &Element, next: &Element) {
        if prev.ref_name() == next.ref_name() {
            return;
        }
        let Some(owner) = self.owner(id) else {
            return;
        };
        let Some(owner) = self.instance_mut(owner) else {
            return;
        };
        if let Some(old) = prev.ref_name()
            && owner.refs.get(old) == Some(&id)
        {
            owner.refs.remove(old);
        }
        if let Some(new) = next.ref_name() {
            owner.refs.insert(new.to_owned(), id);
        }
    }
}

/// Fold requests made while an update was already in progress into it.
fn absorb(pending: &mut PendingUpdate, queued: PendingUpdate) {
    if let Some(partial) = &queued.state {
        pending.merge_state(partial);
    }
    pending.force |= queued.force;
    pending.callbacks.extend(queued.callbacks);
}
