//! Threshold evaluation of a snapshot into candidate alerts
//!
//! Each rule is independent and re-evaluated every cycle against the current
//! snapshot; there is no hysteresis beyond what throttling provides. The
//! emission order (heap, oldgen, oom prediction, stuck threads, thread pool,
//! cpu, memory) is stable and used only for presentation.

use crate::config::Thresholds;
use crate::models::{Alert, AlertLevel, MetricSnapshot};

/// Applies threshold rules to a snapshot and produces candidate alerts
pub struct AlertEvaluator {
    thresholds: Thresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate all rules against a snapshot.
    ///
    /// Alert timestamps come from the snapshot so that a cycle's alerts and
    /// its published metrics agree on when they were observed.
    pub fn evaluate(&self, snapshot: &MetricSnapshot) -> Vec<Alert> {
        let t = &self.thresholds;
        let now = snapshot.timestamp;
        let mut alerts = Vec::new();

        // Heap: two-level rule, first match wins
        let heap_usage = snapshot.heap.usage_percent;
        if heap_usage >= t.heap_critical {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                title: "Critical Heap Usage".to_string(),
                message: format!("Heap usage is at {:.1}%", heap_usage * 100.0),
                metric: "heap_usage".to_string(),
                value: heap_usage,
                threshold: t.heap_critical,
                timestamp: now,
            });
        } else if heap_usage >= t.heap_warn {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                title: "High Heap Usage".to_string(),
                message: format!("Heap usage is at {:.1}%", heap_usage * 100.0),
                metric: "heap_usage".to_string(),
                value: heap_usage,
                threshold: t.heap_warn,
                timestamp: now,
            });
        }

        // OldGen: critical only, no warning level. `oldgen_warn` exists in
        // the config but deliberately does not alert.
        let oldgen_usage = snapshot.oldgen.usage_percent;
        if oldgen_usage >= t.oldgen_critical {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                title: "Critical OldGen Usage".to_string(),
                message: format!("OldGen usage is at {:.1}%", oldgen_usage * 100.0),
                metric: "oldgen_usage".to_string(),
                value: oldgen_usage,
                threshold: t.oldgen_critical,
                timestamp: now,
            });
        }

        // OOM prediction
        if let Some(prediction) = &snapshot.oom_prediction {
            if prediction.predicted
                && prediction.time_to_oom_seconds < t.oom_prediction_threshold_secs
            {
                alerts.push(Alert {
                    level: AlertLevel::Critical,
                    title: "OOM Predicted".to_string(),
                    message: format!(
                        "OOM predicted in {:.1} minutes",
                        prediction.time_to_oom_seconds / 60.0
                    ),
                    metric: "oom_prediction".to_string(),
                    value: prediction.time_to_oom_seconds,
                    threshold: t.oom_prediction_threshold_secs,
                    timestamp: now,
                });
            }
        }

        // Stuck threads
        let stuck = snapshot.stuck_threads;
        if stuck > 0 {
            let level = if stuck >= 10 {
                AlertLevel::Critical
            } else {
                AlertLevel::Warning
            };
            alerts.push(Alert {
                level,
                title: "Stuck Threads Detected".to_string(),
                message: format!("{} threads are stuck or blocked", stuck),
                metric: "stuck_threads".to_string(),
                value: stuck as f64,
                threshold: 0.0,
                timestamp: now,
            });
        }

        // Thread pool: two-level rule, first match wins
        let utilization = snapshot.thread_pool.utilization;
        if utilization >= t.thread_pool_critical {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                title: "Critical Thread Pool Saturation".to_string(),
                message: format!("Thread pool utilization is at {:.1}%", utilization * 100.0),
                metric: "thread_pool_utilization".to_string(),
                value: utilization,
                threshold: t.thread_pool_critical,
                timestamp: now,
            });
        } else if utilization >= t.thread_pool_warn {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                title: "High Thread Pool Utilization".to_string(),
                message: format!("Thread pool utilization is at {:.1}%", utilization * 100.0),
                metric: "thread_pool_utilization".to_string(),
                value: utilization,
                threshold: t.thread_pool_warn,
                timestamp: now,
            });
        }

        // CPU: critical only, same deliberate asymmetry as oldgen
        let cpu_fraction = snapshot.os.cpu.cpu_percent / 100.0;
        if cpu_fraction >= t.cpu_critical {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                title: "Critical CPU Usage".to_string(),
                message: format!("CPU usage is at {:.1}%", cpu_fraction * 100.0),
                metric: "cpu_usage".to_string(),
                value: cpu_fraction,
                threshold: t.cpu_critical,
                timestamp: now,
            });
        }

        // Memory: critical only
        let memory_fraction = snapshot.os.memory.percent / 100.0;
        if memory_fraction >= t.memory_critical {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                title: "Critical Memory Usage".to_string(),
                message: format!("Memory usage is at {:.1}%", memory_fraction * 100.0),
                metric: "memory_usage".to_string(),
                value: memory_fraction,
                threshold: t.memory_critical,
                timestamp: now,
            });
        }

        alerts
    }
}
