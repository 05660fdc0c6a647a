//! Update batching: the phase machine and the queues it guards.
//!
//! Mutation requests made while a batch is open are merged per instance into
//! a [`PendingUpdate`] and the instance is marked dirty. Closing the outermost
//! batch flushes: dirty instances are reconciled in passes until no work is
//! left, each pass ending with did-mount/did-update hooks and then the
//! completion callbacks queued for it.

use core::mem;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::component::Callback;
use crate::element::Element;
use crate::instance::InstanceId;
use crate::value::{ValueMap, merge_into};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Batching,
    Flushing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEvent {
    /// A batch was opened (explicitly or by a mutation request).
    Open,
    /// A batch-opening call returned.
    Close,
    /// A flush pass finished; `work_remaining` if it queued further updates.
    PassComplete { work_remaining: bool },
    /// The flush failed and all queued work was discarded.
    Abort,
}

/// Next `(phase, open batch depth)` for `event`.
///
/// Opening while a batch is open (or a flush is running) joins it. Only the
/// close of the outermost batch moves `Batching` to `Flushing`; closes nested
/// inside a flush never start a second one.
pub const fn transition(phase: BatchPhase, depth: usize, event: BatchEvent) -> (BatchPhase, usize) {
    match (phase, event) {
        (_, BatchEvent::Abort) => (BatchPhase::Idle, 0),
        (BatchPhase::Idle, BatchEvent::Open) => (BatchPhase::Batching, 1),
        (BatchPhase::Batching | BatchPhase::Flushing, BatchEvent::Open) => (phase, depth + 1),
        (BatchPhase::Batching, BatchEvent::Close) if depth <= 1 => (BatchPhase::Flushing, 0),
        (BatchPhase::Batching | BatchPhase::Flushing, BatchEvent::Close) => {
            (phase, depth.saturating_sub(1))
        }
        (BatchPhase::Flushing, BatchEvent::PassComplete { work_remaining: false }) => {
            (BatchPhase::Idle, 0)
        }
        (BatchPhase::Idle, BatchEvent::Close | BatchEvent::PassComplete { .. }) => (BatchPhase::Idle, 0),
        (
            BatchPhase::Batching | BatchPhase::Flushing,
            BatchEvent::PassComplete { .. },
        ) => (phase, depth),
    }
}

/// Merged mutation requests for one instance.
#[derive(Default)]
pub struct PendingUpdate {
    /// Replacement element (root `set_props` or a re-render onto the same target).
    pub element: Option<Element>,
    pub state: Option<ValueMap>,
    pub force: bool,
    pub callbacks: Vec<Callback>,
}

impl PendingUpdate {
    pub fn merge_state(&mut self, partial: &ValueMap) {
        merge_into(self.state.get_or_insert_with(ValueMap::new), partial);
    }
}

/// Lifecycle hooks fired after a pass's DOM batch has been applied.
#[derive(Debug)]
pub enum ReadyHook {
    DidMount(InstanceId),
    DidUpdate {
        id: InstanceId,
        prev_props: ValueMap,
        prev_state: ValueMap,
    },
}

pub struct BatchContext {
    phase: BatchPhase,
    depth: usize,
    /// Instances with pending updates, in request order.
    dirty: Vec<InstanceId>,
    pending: HashMap<InstanceId, PendingUpdate>,
    ready: Vec<ReadyHook>,
    callbacks: VecDeque<(InstanceId, Callback)>,
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchContext {
    pub fn new() -> Self {
        Self {
            phase: BatchPhase::Idle,
            depth: 0,
            dirty: Vec::new(),
            pending: HashMap::new(),
            ready: Vec::new(),
            callbacks: VecDeque::new(),
        }
    }

    pub const fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub(crate) fn apply(&mut self, event: BatchEvent) -> BatchPhase {
        let (phase, depth) = transition(self.phase, self.depth, event);
        self.phase = phase;
        self.depth = depth;
        phase
    }

    /// Merge a request into `id`'s pending update, marking it dirty.
    pub(crate) fn enqueue(&mut self, id: InstanceId, request: impl FnOnce(&mut PendingUpdate)) {
        let entry = self.pending.entry(id).or_insert_with(|| {
            self.dirty.push(id);
            PendingUpdate::default()
        });
        request(entry);
    }

    pub(crate) fn has_pending(&self, id: InstanceId) -> bool {
        self.pending.contains_key(&id)
    }

    pub(crate) fn take_pending(&mut self, id: InstanceId) -> Option<PendingUpdate> {
        self.pending.remove(&id)
    }

    /// Dirty instances in first-request order, without duplicates.
    pub(crate) fn take_dirty(&mut self) -> Vec<InstanceId> {
        let mut seen = HashSet::new();
        mem::take(&mut self.dirty)
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub(crate) fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Forget queued work for an instance that is going away.
    pub(crate) fn drop_instance(&mut self, id: InstanceId) {
        self.pending.remove(&id);
        self.dirty.retain(|dirty| *dirty != id);
    }

    pub(crate) fn push_ready(&mut self, hook: ReadyHook) {
        self.ready.push(hook);
    }

    pub(crate) fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub(crate) fn take_ready(&mut self) -> Vec<ReadyHook> {
        mem::take(&mut self.ready)
    }

    pub(crate) fn push_callback(&mut self, id: InstanceId, callback: Callback) {
        self.callbacks.push_back((id, callback));
    }

    pub(crate) fn pop_callback(&mut self) -> Option<(InstanceId, Callback)> {
        self.callbacks.pop_front()
    }

    pub(crate) fn has_callbacks(&self) -> bool {
        !self.callbacks.is_empty()
    }

    /// Discard all queued work and return to idle.
    pub(crate) fn reset(&mut self) {
        self.apply(BatchEvent::Abort);
        self.dirty.clear();
        self.pending.clear();
        self.ready.clear();
        self.callbacks.clear();
    }
}
