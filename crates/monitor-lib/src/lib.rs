//! Monitoring library for JVM application servers
//!
//! This crate provides the core functionality for:
//! - Metric collection from the JVM, the host, and the access log
//! - Weighted health scoring
//! - Heap growth trend prediction with OOM projection
//! - Threshold alerting with per-metric throttling and webhook delivery
//! - A periodic coordinator that publishes each cycle's results atomically

pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod models;
pub mod observability;
pub mod scoring;
pub mod source;
pub mod trend;

pub use alerts::{AlertDispatcher, AlertEvaluator, AlertManager, AlertSink, WebhookSink};
pub use config::{MonitorConfig, ScoreWeights, Thresholds};
pub use coordinator::{Coordinator, StatusReport};
pub use models::*;
pub use observability::MonitorMetrics;
pub use scoring::HealthScorer;
pub use source::{AccessLogSource, JvmSource, MetricSource, OsSource};
pub use trend::TrendPredictor;
