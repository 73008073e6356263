//! Alert generation, throttling, and delivery
//!
//! This module provides:
//! - Threshold evaluation of a snapshot into candidate alerts
//! - Per-metric-key throttling and a prunable alert log
//! - Dispatch to configured delivery channels

mod dispatch;
mod evaluator;
mod throttle;

pub use dispatch::{AlertDispatcher, AlertSink, ChannelStats, WebhookSink, WebhookSinkConfig};
pub use evaluator::AlertEvaluator;
pub use throttle::AlertManager;
