//! Metric observation hook.
//!
//! The pipeline emits a small number of counters through
//! [`MetricRecorder`]; the sink behind it (telemetry upload, local
//! aggregation) is out of scope. Recording happens on the receiving
//! thread, so implementations should enqueue rather than block.

/// Receives pipeline counters.
pub trait MetricRecorder: Send + Sync {
    /// A directive left the intake queue and entered triage.
    ///
    /// `name` is the directive's operation name (the second half of
    /// its routing key), the customary metric dimension for dispatch
    /// latency dashboards.
    fn directive_dequeued(&self, name: &str);
}
