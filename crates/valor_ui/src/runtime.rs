//! The component runtime: instance arena, mount roots, host document and the
//! batch context every mutation goes through.

use core::mem;
use std::collections::HashMap;

use html::{DOM, DOMUpdate, NodeKey};
use indextree::{Arena, Node, NodeId};
use log::{debug, warn};
use tracing::debug_span;

use crate::batch::{BatchContext, BatchEvent, BatchPhase, ReadyHook};
use crate::component::{Callback, Scope};
use crate::config::UiConfig;
use crate::element::Element;
use crate::error::UiError;
use crate::instance::{Instance, InstanceId, Lifecycle};
use crate::telemetry::{self, ReconcileCounters};
use crate::value::{ValueMap, merge_into};

pub struct Ui {
    pub(crate) instances: Arena<Instance>,
    pub(crate) dom: DOM,
    pub(crate) roots: HashMap<NodeKey, InstanceId>,
    pub(crate) batch: BatchContext,
    pub(crate) config: UiConfig,
    /// DOM updates of the current pass, applied together at commit.
    pub(crate) ops: Vec<DOMUpdate>,
    pub(crate) counters: ReconcileCounters,
    /// Server rendering: no did-mount hooks.
    pub(crate) server: bool,
    next_root: u64,
    empty: ValueMap,
}

impl Ui {
    pub fn new(dom: DOM) -> Self {
        Self::with_config(dom, UiConfig::default())
    }

    pub fn with_config(dom: DOM, config: UiConfig) -> Self {
        Self {
            instances: Arena::new(),
            dom,
            roots: HashMap::new(),
            batch: BatchContext::new(),
            config,
            ops: Vec::new(),
            counters: ReconcileCounters::default(),
            server: false,
            next_root: 0,
            empty: ValueMap::new(),
        }
    }

    pub(crate) fn server() -> Self {
        let mut ui = Self::with_config(DOM::new(), UiConfig::default());
        ui.server = true;
        ui
    }

    pub const fn dom(&self) -> &DOM {
        &self.dom
    }

    /// Direct access to the host document, e.g. to create containers.
    pub const fn dom_mut(&mut self) -> &mut DOM {
        &mut self.dom
    }

    pub fn into_dom(self) -> DOM {
        self.dom
    }

    pub const fn config(&self) -> &UiConfig {
        &self.config
    }

    pub const fn counters(&self) -> ReconcileCounters {
        self.counters
    }

    pub const fn batch_phase(&self) -> BatchPhase {
        self.batch.phase()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        if id.node().is_removed(&self.instances) {
            return None;
        }
        self.instances.get(id.node()).map(Node::get)
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        if id.node().is_removed(&self.instances) {
            return None;
        }
        self.instances.get_mut(id.node()).map(Node::get_mut)
    }

    pub fn state(&self, id: InstanceId) -> Option<&ValueMap> {
        self.instance(id).map(Instance::state)
    }

    pub fn props(&self, id: InstanceId) -> Option<&ValueMap> {
        self.instance(id).map(Instance::props)
    }

    pub(crate) fn props_or_empty(&self, id: InstanceId) -> &ValueMap {
        self.props(id).unwrap_or(&self.empty)
    }

    pub(crate) fn state_or_empty(&self, id: InstanceId) -> &ValueMap {
        self.state(id).unwrap_or(&self.empty)
    }

    pub fn mount_id(&self, id: InstanceId) -> Option<&str> {
        self.instance(id).map(Instance::mount_id)
    }

    pub fn mount_depth(&self, id: InstanceId) -> Option<usize> {
        self.instance(id).map(Instance::depth)
    }

    pub fn owner(&self, id: InstanceId) -> Option<InstanceId> {
        self.instance(id).and_then(Instance::owner)
    }

    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.instance(id)?;
        id.node().parent(&self.instances).map(InstanceId::from)
    }

    /// Child instances: a host's children in order, or a composite's rendered child.
    pub fn children(&self, id: InstanceId) -> Vec<InstanceId> {
        if self.instance(id).is_none() {
            return Vec::new();
        }
        id.node()
            .children(&self.instances)
            .map(InstanceId::from)
            .collect()
    }

    pub fn rendered_child(&self, id: InstanceId) -> Option<InstanceId> {
        self.instance(id)?.class()?;
        self.children(id).first().copied()
    }

    pub fn root_instance(&self, target: NodeKey) -> Option<InstanceId> {
        self.roots.get(&target).copied()
    }

    /// Component name, tag, or `#text`.
    pub fn class_name(&self, id: InstanceId) -> Option<&str> {
        self.instance(id).map(Instance::display_name)
    }

    /// The document node an instance renders to.
    pub fn dom_node(&self, id: InstanceId) -> Option<NodeKey> {
        self.dom.find_by_mount_id(self.mount_id(id)?)
    }

    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.instance(id)
            .is_some_and(|instance| instance.lifecycle != Lifecycle::Mounting)
    }

    pub fn get_ref(&self, id: InstanceId, name: &str) -> Option<InstanceId> {
        let target = *self.instance(id)?.refs.get(name)?;
        self.instance(target).map(|_| target)
    }

    /// Render `element` into `target`, mounting a new root or updating the
    /// existing one in place when it is compatible.
    ///
    /// # Errors
    /// Any [`UiError`] raised while validating, mounting or reconciling.
    pub fn render(&mut self, element: impl Into<Element>, target: NodeKey) -> Result<InstanceId, UiError> {
        self.render_root(element.into(), target, None)
    }

    /// [`Ui::render`] with a callback bound to the root instance, run once
    /// the render has been committed.
    ///
    /// # Errors
    /// Same as [`Ui::render`].
    pub fn render_with(
        &mut self,
        element: impl Into<Element>,
        target: NodeKey,
        callback: impl FnOnce(&mut Scope<'_>) + 'static,
    ) -> Result<InstanceId, UiError> {
        self.render_root(element.into(), target, Some(Box::new(callback)))
    }

    /// Run `update` inside a batch. Mutations it requests are queued and
    /// flushed once, when the outermost batch closes.
    ///
    /// # Errors
    /// The error returned by `update`, or one raised by the flush. Either
    /// discards all queued work.
    pub fn batched_updates<R>(
        &mut self,
        update: impl FnOnce(&mut Self) -> Result<R, UiError>,
    ) -> Result<R, UiError> {
        let outermost = self.batch.phase() == BatchPhase::Idle;
        self.batch.apply(BatchEvent::Open);
        let result = update(self);
        self.batch.apply(BatchEvent::Close);
        if !outermost {
            return result;
        }
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                self.abort();
                return Err(err);
            }
        };
        match self.flush() {
            Ok(()) => Ok(value),
            Err(err) => {
                warn!(target: "valor_ui::batch", "flush failed, discarding queued work: {err}");
                self.abort();
                Err(err)
            }
        }
    }

    fn abort(&mut self) {
        self.batch.reset();
        self.ops.clear();
    }

    /// Queue a shallow state merge for `id`.
    ///
    /// # Errors
    /// Errors raised while flushing, when no batch was open.
    pub fn set_state(&mut self, id: InstanceId, partial: ValueMap) -> Result<(), UiError> {
        self.batched_updates(|ui| {
            ui.enqueue_state(id, partial, None);
            Ok(())
        })
    }

    /// [`Ui::set_state`] with a callback run after the update is committed.
    ///
    /// # Errors
    /// Same as [`Ui::set_state`].
    pub fn set_state_with(
        &mut self,
        id: InstanceId,
        partial: ValueMap,
        callback: impl FnOnce(&mut Scope<'_>) + 'static,
    ) -> Result<(), UiError> {
        self.batched_updates(|ui| {
            ui.enqueue_state(id, partial, Some(Box::new(callback)));
            Ok(())
        })
    }

    /// Queue a re-render of `id` that skips its should-update guard.
    ///
    /// # Errors
    /// Errors raised while flushing, when no batch was open.
    pub fn force_update(&mut self, id: InstanceId) -> Result<(), UiError> {
        self.batched_updates(|ui| {
            ui.enqueue_force(id, None);
            Ok(())
        })
    }

    /// [`Ui::force_update`] with a callback run after the update is committed.
    ///
    /// # Errors
    /// Same as [`Ui::force_update`].
    pub fn force_update_with(
        &mut self,
        id: InstanceId,
        callback: impl FnOnce(&mut Scope<'_>) + 'static,
    ) -> Result<(), UiError> {
        self.batched_updates(|ui| {
            ui.enqueue_force(id, Some(Box::new(callback)));
            Ok(())
        })
    }

    /// Queue a shallow props merge for a root instance.
    ///
    /// # Errors
    /// [`UiError::StaleInstance`] if `id` is unmounted, [`UiError::SetPropsOnChild`]
    /// if it is not a root, or errors raised while flushing.
    pub fn set_props(&mut self, id: InstanceId, partial: ValueMap) -> Result<(), UiError> {
        self.set_props_inner(id, partial, None)
    }

    /// [`Ui::set_props`] with a callback run after the update is committed.
    ///
    /// # Errors
    /// Same as [`Ui::set_props`].
    pub fn set_props_with(
        &mut self,
        id: InstanceId,
        partial: ValueMap,
        callback: impl FnOnce(&mut Scope<'_>) + 'static,
    ) -> Result<(), UiError> {
        self.set_props_inner(id, partial, Some(Box::new(callback)))
    }

    fn set_props_inner(
        &mut self,
        id: InstanceId,
        partial: ValueMap,
        callback: Option<Callback>,
    ) -> Result<(), UiError> {
        let instance = self.instance(id).ok_or(UiError::StaleInstance)?;
        if instance.container.is_none() {
            return Err(UiError::SetPropsOnChild(instance.display_name().to_owned()));
        }
        let current = instance.element.clone();
        self.batched_updates(|ui| {
            ui.batch.enqueue(id, |pending| {
                let base = pending.element.take().unwrap_or(current);
                let mut props = base.props().clone();
                merge_into(&mut props, &partial);
                pending.element = Some(base.rebuild(
                    props,
                    base.key().map(str::to_owned),
                    base.ref_name().map(str::to_owned),
                ));
                pending.callbacks.extend(callback);
            });
            Ok(())
        })
    }

    pub(crate) fn enqueue_state(&mut self, id: InstanceId, partial: ValueMap, callback: Option<Callback>) {
        let Some(instance) = self.instance_mut(id) else {
            warn!(target: "valor_ui::batch", "set_state on unmounted {id} dropped");
            return;
        };
        match instance.lifecycle {
            Lifecycle::Mounting => {
                // Merged before the first render.
                merge_into(&mut instance.state, &partial);
                if let Some(callback) = callback {
                    self.batch.push_callback(id, callback);
                }
            }
            Lifecycle::Unmounting => {
                warn!(target: "valor_ui::batch", "set_state on unmounting {id} dropped");
            }
            Lifecycle::Mounted => self.batch.enqueue(id, |pending| {
                pending.merge_state(&partial);
                pending.callbacks.extend(callback);
            }),
        }
    }

    pub(crate) fn enqueue_force(&mut self, id: InstanceId, callback: Option<Callback>) {
        let Some(instance) = self.instance(id) else {
            warn!(target: "valor_ui::batch", "force_update on unmounted {id} dropped");
            return;
        };
        match instance.lifecycle {
            Lifecycle::Mounting => {
                if let Some(callback) = callback {
                    self.batch.push_callback(id, callback);
                }
            }
            Lifecycle::Unmounting => {
                warn!(target: "valor_ui::batch", "force_update on unmounting {id} dropped");
            }
            Lifecycle::Mounted => self.batch.enqueue(id, |pending| {
                pending.force = true;
                pending.callbacks.extend(callback);
            }),
        }
    }

    /// Run passes until nothing is left to commit.
    fn flush(&mut self) -> Result<(), UiError> {
        let span = debug_span!("flush");
        let _guard = span.enter();
        loop {
            let mut dirty = self.batch.take_dirty();
            // Stable: equal depths keep request order.
            dirty.sort_by_key(|id| self.instance(*id).map_or(usize::MAX, Instance::depth));
            if !dirty.is_empty() {
                debug!(target: "valor_ui::batch", "flush pass over {} dirty instances", dirty.len());
            }
            for id in dirty {
                if self.batch.has_pending(id) {
                    self.update_instance(id)?;
                }
            }
            self.commit()?;
            // Hooks and callbacks may have queued work of their own.
            let work_remaining = self.has_uncommitted();
            if self.batch.apply(BatchEvent::PassComplete { work_remaining }) == BatchPhase::Idle {
                break;
            }
        }
        telemetry::maybe_emit(self.config.telemetry_enabled, &self.counters);
        Ok(())
    }

    fn has_uncommitted(&self) -> bool {
        self.batch.has_dirty()
            || self.batch.has_ready()
            || self.batch.has_callbacks()
            || !self.ops.is_empty()
    }

    /// Apply the pass's DOM updates, then fire did-mount/did-update hooks in
    /// queue order, then completion callbacks in request order.
    fn commit(&mut self) -> Result<(), UiError> {
        let ops = mem::take(&mut self.ops);
        let ready = self.batch.take_ready();
        let has_callbacks = self.batch.has_callbacks();
        if ops.is_empty() && ready.is_empty() && !has_callbacks {
            return Ok(());
        }
        self.counters.passes += 1;
        self.counters.dom_ops += ops.len() as u64;
        self.counters.content_writes += ops
            .iter()
            .filter(|op| matches!(op, DOMUpdate::SetContent { .. }))
            .count() as u64;
        self.dom.apply_batch(ops)?;

        for hook in ready {
            self.fire_ready(hook);
        }
        while let Some((id, callback)) = self.batch.pop_callback() {
            if self.is_mounted(id) {
                callback(&mut Scope::new(self, id));
            } else {
                debug!(target: "valor_ui::batch", "callback for unmounted {id} dropped");
            }
        }
        Ok(())
    }

    fn fire_ready(&mut self, hook: ReadyHook) {
        match hook {
            ReadyHook::DidMount(id) => {
                let Some(did_mount) = self
                    .instance(id)
                    .and_then(Instance::class)
                    .and_then(|class| class.hooks().did_mount.get())
                else {
                    return;
                };
                did_mount(&mut Scope::new(self, id));
            }
            ReadyHook::DidUpdate {
                id,
                prev_props,
                prev_state,
            } => {
                let Some(did_update) = self
                    .instance(id)
                    .and_then(Instance::class)
                    .and_then(|class| class.hooks().did_update.get())
                else {
                    return;
                };
                did_update(&mut Scope::new(self, id), &prev_props, &prev_state);
            }
        }
    }

    pub(crate) fn next_root_id(&mut self) -> String {
        let mount_id = format!(".{}", self.next_root);
        self.next_root += 1;
        mount_id
    }

    pub(crate) fn new_instance(&mut self, instance: Instance, parent: Option<InstanceId>) -> Result<InstanceId, UiError> {
        let node: NodeId = self.instances.new_node(instance);
        if let Some(parent) = parent {
            parent
                .node()
                .checked_append(node, &mut self.instances)
                .map_err(|err| UiError::Host(anyhow::anyhow!("cannot attach instance: {err:?}")))?;
        }
        Ok(InstanceId::from(node))
    }
}
