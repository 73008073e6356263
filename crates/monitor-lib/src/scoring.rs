//! Health scoring
//!
//! Maps a metric snapshot to per-component scores and one weighted overall
//! score. Scoring is a pure function of the snapshot and the configured
//! weights/thresholds; absent metrics score against their zero defaults.

use crate::config::{ScoreWeights, Thresholds};
use crate::models::{HealthScore, HealthStatus, MetricSnapshot};
use std::collections::BTreeMap;

/// Score a single usage fraction on a 0-100 scale.
///
/// Piecewise linear: 100 at zero usage, 90 at the warn threshold, 70 at the
/// critical threshold, decaying to 0 at full usage. Continuous at both
/// boundaries.
pub fn score_metric(value: f64, warn: f64, critical: f64) -> f64 {
    if value <= warn {
        100.0 - (value / warn) * 10.0
    } else if value <= critical {
        let position = (value - warn) / (critical - warn);
        90.0 - position * 20.0
    } else {
        let position = (value - critical) / (1.0 - critical);
        (70.0 * (1.0 - position)).max(0.0)
    }
}

/// Stepwise score for stuck threads; any stuck thread is already bad.
pub fn score_stuck_threads(stuck: u32) -> f64 {
    if stuck == 0 {
        100.0
    } else if stuck < 5 {
        80.0
    } else if stuck < 10 {
        50.0
    } else {
        0.0
    }
}

/// Calculates the weighted health score for a snapshot
pub struct HealthScorer {
    weights: ScoreWeights,
    thresholds: Thresholds,
}

impl HealthScorer {
    pub fn new(weights: ScoreWeights, thresholds: Thresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Calculate the overall health score for a snapshot.
    ///
    /// Never fails: missing sections contribute their zero defaults, and a
    /// non-finite weighted sum degrades to a zero score with `error` status
    /// instead of propagating.
    pub fn calculate(&self, snapshot: &MetricSnapshot) -> HealthScore {
        let t = &self.thresholds;

        let heap = score_metric(snapshot.heap.usage_percent, t.heap_warn, t.heap_critical);
        let thread_pool = score_metric(
            snapshot.thread_pool.utilization,
            t.thread_pool_warn,
            t.thread_pool_critical,
        );
        let cpu = score_metric(snapshot.os.cpu.cpu_percent / 100.0, t.cpu_warn, t.cpu_critical);
        let memory = score_metric(
            snapshot.os.memory.percent / 100.0,
            t.memory_warn,
            t.memory_critical,
        );
        let stuck_threads = score_stuck_threads(snapshot.stuck_threads);

        let mut component_scores = BTreeMap::new();
        component_scores.insert("heap".to_string(), heap);
        component_scores.insert("thread_pool".to_string(), thread_pool);
        component_scores.insert("cpu".to_string(), cpu);
        component_scores.insert("memory".to_string(), memory);
        component_scores.insert("stuck_threads".to_string(), stuck_threads);

        let w = &self.weights;
        let overall = heap * w.heap
            + thread_pool * w.thread_pool
            + cpu * w.cpu
            + memory * w.memory
            + stuck_threads * w.stuck_threads;

        let (overall_score, health_status) = if overall.is_finite() {
            let rounded = (overall * 100.0).round() / 100.0;
            (rounded, status_for_score(rounded))
        } else {
            (0.0, HealthStatus::Error)
        };

        HealthScore {
            overall_score,
            component_scores,
            health_status,
            timestamp: snapshot.timestamp,
        }
    }
}

fn status_for_score(score: f64) -> HealthStatus {
    if score >= 90.0 {
        HealthStatus::Healthy
    } else if score >= 70.0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Critical
    }
}
