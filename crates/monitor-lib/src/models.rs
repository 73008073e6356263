//! Core data models for the monitoring toolkit

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current wall-clock time as fractional seconds since the Unix epoch.
///
/// All published timestamps use this representation so that the status API
/// serializes them as plain numbers.
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Heap memory metrics from the JVM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeapMetrics {
    pub used: u64,
    pub max: u64,
    pub committed: u64,
    /// Usage as a 0-1 fraction of `max`
    pub usage_percent: f64,
    pub timestamp: f64,
}

/// Old generation memory pool metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OldGenMetrics {
    pub used: u64,
    pub max: u64,
    pub committed: u64,
    pub usage_percent: f64,
    pub timestamp: f64,
}

/// Connector thread pool metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadPoolMetrics {
    pub current_threads: u32,
    pub current_busy: u32,
    pub max_threads: u32,
    /// Busy threads as a 0-1 fraction of `max_threads`
    pub utilization: f64,
    pub timestamp: f64,
}

/// Host CPU metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Busy CPU time as a 0-100 percentage
    pub cpu_percent: f64,
    pub load_average_1m: f64,
    pub load_average_5m: f64,
    pub load_average_15m: f64,
    pub cpu_count: u32,
}

/// Host memory metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_mb: f64,
    pub available_mb: f64,
    pub used_mb: f64,
    /// Used memory as a 0-100 percentage
    pub percent: f64,
    pub swap_percent: f64,
}

/// Operating system metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsMetrics {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub timestamp: f64,
}

/// A frequently requested path and its hit count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

/// Aggregate statistics over recently parsed access-log entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestStats {
    pub total_requests: u64,
    pub slow_requests: u64,
    pub avg_response_time_ms: f64,
    pub max_response_time_ms: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub top_paths: Vec<PathCount>,
}

/// One heap usage observation retained by the trend predictor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeapSample {
    pub used: u64,
    pub max: u64,
    pub timestamp: f64,
}

/// Projected heap exhaustion derived from the recent growth rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OomPrediction {
    pub predicted: bool,
    pub time_to_oom_seconds: f64,
    pub growth_rate_bytes_per_sec: f64,
    pub current_usage_percent: f64,
    pub timestamp: f64,
}

/// The complete set of metrics collected in one monitoring cycle.
///
/// Sources fill only their own sections; a failed source leaves its section
/// at the zero default and records an entry in `errors`. Defaulting missing
/// metrics to zero is deliberate policy, not a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub heap: HeapMetrics,
    pub oldgen: OldGenMetrics,
    pub thread_pool: ThreadPoolMetrics,
    pub os: OsMetrics,
    pub stuck_threads: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oom_prediction: Option<OomPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<RequestStats>,
    /// Source name -> error message for sources that failed this cycle
    pub errors: BTreeMap<String, String>,
    pub timestamp: f64,
}

/// Overall health classification derived from the weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Score 90-100
    Healthy,
    /// Score 70-89
    Warning,
    /// Score below 70
    Critical,
    /// Scoring produced no usable value; the score is degraded to zero
    Error,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
            HealthStatus::Error => write!(f, "error"),
        }
    }
}

/// Weighted 0-100 composite health score with per-component breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScore {
    pub overall_score: f64,
    pub component_scores: BTreeMap<String, f64>,
    pub health_status: HealthStatus,
    pub timestamp: f64,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A single alert, immutable once created.
///
/// `metric` is the stable key used for throttling: two alerts with the same
/// key share one cooldown window regardless of level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_default_is_all_zero() {
        let snapshot = MetricSnapshot::default();
        assert_eq!(snapshot.heap.used, 0);
        assert_eq!(snapshot.heap.usage_percent, 0.0);
        assert_eq!(snapshot.thread_pool.utilization, 0.0);
        assert_eq!(snapshot.stuck_threads, 0);
        assert!(snapshot.oom_prediction.is_none());
        assert!(snapshot.requests.is_none());
        assert!(snapshot.errors.is_empty());
    }

    #[test]
    fn test_alert_level_serialization() {
        assert_eq!(
            serde_json::to_string(&AlertLevel::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(AlertLevel::Warning.to_string(), "warning");
    }

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(HealthStatus::Error.to_string(), "error");
    }
}
