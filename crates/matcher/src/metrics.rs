// Metrics hooks for the `matcher` crate.
//
// Callers install a global `CycleMetrics` implementation via [`set_cycle_metrics`];
// every call to [`MatchEngine::run_cycle`](crate::MatchEngine::run_cycle) then
// reports its latency and the resulting [`CycleReport`].
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::CycleReport;

/// Metrics observer for match cycles.
pub trait CycleMetrics: Send + Sync {
    /// Record one completed cycle. `latency` covers both phases.
    fn record_cycle(&self, latency: Duration, report: &CycleReport);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn CycleMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn CycleMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn CycleMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global cycle metrics recorder.
pub fn set_cycle_metrics(recorder: Option<Arc<dyn CycleMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
