//! Observability infrastructure for the monitor
//!
//! Provides Prometheus metrics about the monitor itself (cycle latency,
//! published health score, alert and error counters). Application metrics
//! about the monitored JVM flow through the status API, not this registry.

use prometheus::{
    register_gauge, register_histogram, register_int_counter, Gauge, Histogram, IntCounter,
};
use std::sync::OnceLock;

/// Histogram buckets for cycle latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    cycle_latency_seconds: Histogram,
    health_score: Gauge,
    alerts_emitted: IntCounter,
    alerts_throttled: IntCounter,
    collection_errors: IntCounter,
    dispatch_failures: IntCounter,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "jvm_monitor_cycle_latency_seconds",
                "Time spent running one monitoring cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            health_score: register_gauge!(
                "jvm_monitor_health_score",
                "Most recently published overall health score (0-100)"
            )
            .expect("Failed to register health_score"),

            alerts_emitted: register_int_counter!(
                "jvm_monitor_alerts_emitted_total",
                "Total alerts accepted by the throttle and dispatched"
            )
            .expect("Failed to register alerts_emitted"),

            alerts_throttled: register_int_counter!(
                "jvm_monitor_alerts_throttled_total",
                "Total alerts suppressed by the cooldown window"
            )
            .expect("Failed to register alerts_throttled"),

            collection_errors: register_int_counter!(
                "jvm_monitor_collection_errors_total",
                "Total metric source collection failures"
            )
            .expect("Failed to register collection_errors"),

            dispatch_failures: register_int_counter!(
                "jvm_monitor_dispatch_failures_total",
                "Total failed alert deliveries across all channels"
            )
            .expect("Failed to register dispatch_failures"),
        }
    }
}

/// Monitor metrics for Prometheus exposition.
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record how long one monitoring cycle took
    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    /// Publish the latest overall health score
    pub fn set_health_score(&self, score: f64) {
        self.inner().health_score.set(score);
    }

    pub fn inc_alerts_emitted(&self) {
        self.inner().alerts_emitted.inc();
    }

    pub fn inc_alerts_throttled(&self) {
        self.inner().alerts_throttled.inc();
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors.inc();
    }

    pub fn inc_dispatch_failures(&self) {
        self.inner().dispatch_failures.inc();
    }
}
