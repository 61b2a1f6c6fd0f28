//! Structured logging and metrics for `Store` operations, in the same shape
//! the teacher's storage backend uses: a counter, a latency histogram and an
//! error counter per [`OperationType`], wired through `tracing` + `metrics`.

use metrics::{counter, histogram};
use std::time::Instant;
use tracing::{debug, error, instrument};

/// Every suspending `Store`/`Backend` operation spec.md §5/§6 names, used as
/// the dimension for metrics and structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    ValueOf,
    NameOf,
    Quad,
    QuadDirection,
    QuadIteratorNext,
    QuadIteratorContains,
    ApplyDeltas,
    RemoveNode,
}

impl OperationType {
    pub fn metric_name(&self) -> &'static str {
        match self {
            OperationType::ValueOf => "qc_store.value_of",
            OperationType::NameOf => "qc_store.name_of",
            OperationType::Quad => "qc_store.quad",
            OperationType::QuadDirection => "qc_store.quad_direction",
            OperationType::QuadIteratorNext => "qc_store.iterator.next",
            OperationType::QuadIteratorContains => "qc_store.iterator.contains",
            OperationType::ApplyDeltas => "qc_store.apply_deltas",
            OperationType::RemoveNode => "qc_store.remove_node",
        }
    }

    fn counter_name(&self) -> String {
        format!("{}.count", self.metric_name())
    }

    fn latency_name(&self) -> String {
        format!("{}.latency_ms", self.metric_name())
    }

    fn error_name(&self) -> String {
        format!("{}.errors", self.metric_name())
    }
}

/// Run `f`, recording its duration and success/failure against `op_type`'s
/// metrics, and logging a structured `debug`/`error` event either way.
#[instrument(level = "debug", skip(f))]
pub fn track_operation<F, T, E>(op_type: OperationType, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Debug,
{
    let start = Instant::now();
    let counter_name = op_type.counter_name();
    let latency_name = op_type.latency_name();
    let error_name = op_type.error_name();

    counter!(counter_name).increment(1);
    let result = f();
    let latency_ms = start.elapsed().as_micros() as f64 / 1000.0;
    histogram!(latency_name).record(latency_ms);

    match &result {
        Ok(_) => {
            debug!(op = ?op_type, latency_ms, "store operation completed");
        }
        Err(e) => {
            counter!(error_name).increment(1);
            error!(op = ?op_type, latency_ms, error = ?e, "store operation failed");
        }
    }
    result
}
