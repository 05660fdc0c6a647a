//! Reconcile counters and their JSON line format.

use log::info;
use serde::Serialize;

/// Totals accumulated over the lifetime of a runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounters {
    pub mounts: u64,
    pub updates: u64,
    pub unmounts: u64,
    /// Flush passes, including the pass of an initial mount.
    pub passes: u64,
    pub dom_ops: u64,
    pub content_writes: u64,
}

impl ReconcileCounters {
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

pub fn maybe_emit(enabled: bool, counters: &ReconcileCounters) {
    if enabled {
        info!(target: "valor_ui::telemetry", "{}", counters.to_json_line());
    }
}
