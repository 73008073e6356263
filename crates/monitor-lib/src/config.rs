//! Strongly typed monitoring configuration.
//!
//! Built once at startup from the binary's settings layer and passed by
//! reference into each component's constructor. Validation is fail-fast:
//! the coordinator never runs with an invalid configuration.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("health score weights must sum to 1.0 (+/- 0.01), got {0}")]
    WeightSum(f64),
    #[error("{name} must be between 0 and 1, got {value}")]
    ThresholdRange { name: &'static str, value: f64 },
    #[error("{warn} must be less than {critical}")]
    ThresholdOrder {
        warn: &'static str,
        critical: &'static str,
    },
    #[error("poll interval must be at least 1 second")]
    PollInterval,
}

/// Per-component weights for the overall health score
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_heap_weight")]
    pub heap: f64,
    #[serde(default = "default_thread_pool_weight")]
    pub thread_pool: f64,
    #[serde(default = "default_cpu_weight")]
    pub cpu: f64,
    #[serde(default = "default_memory_weight")]
    pub memory: f64,
    #[serde(default = "default_stuck_threads_weight")]
    pub stuck_threads: f64,
}

fn default_heap_weight() -> f64 {
    0.25
}

fn default_thread_pool_weight() -> f64 {
    0.25
}

fn default_cpu_weight() -> f64 {
    0.20
}

fn default_memory_weight() -> f64 {
    0.15
}

fn default_stuck_threads_weight() -> f64 {
    0.15
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            heap: default_heap_weight(),
            thread_pool: default_thread_pool_weight(),
            cpu: default_cpu_weight(),
            memory: default_memory_weight(),
            stuck_threads: default_stuck_threads_weight(),
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.heap + self.thread_pool + self.cpu + self.memory + self.stuck_threads
    }

    /// Weights must sum to 1.0, allowing for small floating point error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.sum();
        if !(0.99..=1.01).contains(&total) {
            return Err(ConfigError::WeightSum(total));
        }
        Ok(())
    }
}

/// Warn/critical thresholds for alerting and scoring.
///
/// All usage thresholds are 0-1 fractions; `oom_prediction_threshold_secs`
/// is the time-to-exhaustion below which an OOM prediction alerts.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_heap_warn")]
    pub heap_warn: f64,
    #[serde(default = "default_heap_critical")]
    pub heap_critical: f64,
    #[serde(default = "default_oldgen_warn")]
    pub oldgen_warn: f64,
    #[serde(default = "default_oldgen_critical")]
    pub oldgen_critical: f64,
    #[serde(default = "default_thread_pool_warn")]
    pub thread_pool_warn: f64,
    #[serde(default = "default_thread_pool_critical")]
    pub thread_pool_critical: f64,
    #[serde(default = "default_cpu_warn")]
    pub cpu_warn: f64,
    #[serde(default = "default_cpu_critical")]
    pub cpu_critical: f64,
    #[serde(default = "default_memory_warn")]
    pub memory_warn: f64,
    #[serde(default = "default_memory_critical")]
    pub memory_critical: f64,
    #[serde(default = "default_oom_prediction_threshold")]
    pub oom_prediction_threshold_secs: f64,
}

fn default_heap_warn() -> f64 {
    0.7
}

fn default_heap_critical() -> f64 {
    0.85
}

fn default_oldgen_warn() -> f64 {
    0.8
}

fn default_oldgen_critical() -> f64 {
    0.9
}

fn default_thread_pool_warn() -> f64 {
    0.7
}

fn default_thread_pool_critical() -> f64 {
    0.9
}

fn default_cpu_warn() -> f64 {
    0.8
}

fn default_cpu_critical() -> f64 {
    0.95
}

fn default_memory_warn() -> f64 {
    0.8
}

fn default_memory_critical() -> f64 {
    0.9
}

fn default_oom_prediction_threshold() -> f64 {
    3600.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heap_warn: default_heap_warn(),
            heap_critical: default_heap_critical(),
            oldgen_warn: default_oldgen_warn(),
            oldgen_critical: default_oldgen_critical(),
            thread_pool_warn: default_thread_pool_warn(),
            thread_pool_critical: default_thread_pool_critical(),
            cpu_warn: default_cpu_warn(),
            cpu_critical: default_cpu_critical(),
            memory_warn: default_memory_warn(),
            memory_critical: default_memory_critical(),
            oom_prediction_threshold_secs: default_oom_prediction_threshold(),
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges: [(&'static str, f64); 10] = [
            ("heap_warn", self.heap_warn),
            ("heap_critical", self.heap_critical),
            ("oldgen_warn", self.oldgen_warn),
            ("oldgen_critical", self.oldgen_critical),
            ("thread_pool_warn", self.thread_pool_warn),
            ("thread_pool_critical", self.thread_pool_critical),
            ("cpu_warn", self.cpu_warn),
            ("cpu_critical", self.cpu_critical),
            ("memory_warn", self.memory_warn),
            ("memory_critical", self.memory_critical),
        ];

        for (name, value) in ranges {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdRange { name, value });
            }
        }

        let pairs: [(&'static str, f64, &'static str, f64); 5] = [
            ("heap_warn", self.heap_warn, "heap_critical", self.heap_critical),
            (
                "oldgen_warn",
                self.oldgen_warn,
                "oldgen_critical",
                self.oldgen_critical,
            ),
            (
                "thread_pool_warn",
                self.thread_pool_warn,
                "thread_pool_critical",
                self.thread_pool_critical,
            ),
            ("cpu_warn", self.cpu_warn, "cpu_critical", self.cpu_critical),
            (
                "memory_warn",
                self.memory_warn,
                "memory_critical",
                self.memory_critical,
            ),
        ];

        for (warn, warn_value, critical, critical_value) in pairs {
            if warn_value >= critical_value {
                return Err(ConfigError::ThresholdOrder { warn, critical });
            }
        }

        Ok(())
    }
}

/// Top-level monitoring configuration consumed by the coordinator
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Minimum minutes between two accepted alerts for the same metric key
    #[serde(default = "default_throttle_minutes")]
    pub throttle_minutes: u64,
    /// Monitoring cycle interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Alert log entries older than this are pruned each cycle
    #[serde(default = "default_alert_max_age_secs")]
    pub alert_max_age_secs: f64,
    /// Recency window for `get_active_alerts` in the status report
    #[serde(default = "default_active_alert_window_secs")]
    pub active_alert_window_secs: f64,
    /// Trailing window for the heap growth trend
    #[serde(default = "default_oom_window_secs")]
    pub oom_window_secs: f64,
}

fn default_throttle_minutes() -> u64 {
    15
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_alert_max_age_secs() -> f64 {
    3600.0
}

fn default_active_alert_window_secs() -> f64 {
    300.0
}

fn default_oom_window_secs() -> f64 {
    300.0
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: Thresholds::default(),
            throttle_minutes: default_throttle_minutes(),
            poll_interval_secs: default_poll_interval_secs(),
            alert_max_age_secs: default_alert_max_age_secs(),
            active_alert_window_secs: default_active_alert_window_secs(),
            oom_window_secs: default_oom_window_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::PollInterval);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_sum_rejected() {
        let mut config = MonitorConfig::default();
        config.weights.heap = 0.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum(_)));
    }

    #[test]
    fn test_weight_sum_tolerance() {
        let mut weights = ScoreWeights::default();
        weights.heap = 0.255;
        weights.thread_pool = 0.25;
        // Sum is 1.005, inside the +/- 0.01 tolerance
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_warn_must_be_below_critical() {
        let mut config = MonitorConfig::default();
        config.thresholds.cpu_warn = 0.96;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ThresholdOrder {
                warn: "cpu_warn",
                ..
            }
        ));
    }

    #[test]
    fn test_threshold_range_enforced() {
        let mut config = MonitorConfig::default();
        config.thresholds.heap_critical = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdRange { .. }));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = MonitorConfig::default();
        config.poll_interval_secs = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::PollInterval
        ));
    }
}
