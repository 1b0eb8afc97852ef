//! Metrics sink (`spec.md` §6): the core emits counters, the collector is
//! external (Non-goal: export pipelines). Calls must never block on the
//! sink (`spec.md` §4.7).

/// A label pair attached to a metric emission.
pub type Label<'a> = (&'a str, &'a str);

pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, labels: &[Label<'_>], value: u64);
    fn observe(&self, name: &str, labels: &[Label<'_>], value: f64);
}

/// Discards every emission. Default when no sink is configured.
#[derive(Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment(&self, _name: &str, _labels: &[Label<'_>], _value: u64) {}
    fn observe(&self, _name: &str, _labels: &[Label<'_>], _value: f64) {}
}

/// Emits each metric as a `tracing::info!` event. A reasonable default for
/// development; a real collector (Prometheus, OTel) would subscribe to
/// these spans rather than the sink calling out to one directly.
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn increment(&self, name: &str, labels: &[Label<'_>], value: u64) {
        tracing::info!(metric = name, ?labels, value, "counter increment");
    }

    fn observe(&self, name: &str, labels: &[Label<'_>], value: f64) {
        tracing::info!(metric = name, ?labels, value, "observation");
    }
}
