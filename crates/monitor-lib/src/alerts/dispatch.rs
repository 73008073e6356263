//! Alert delivery channels
//!
//! Dispatches accepted alerts to every configured sink, recording aggregate
//! per-channel counts. Delivery is fire-and-forget: a failed send is logged
//! and counted, never retried, and never fails the monitoring cycle.

use crate::models::Alert;
use crate::observability::MonitorMetrics;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};

/// A single alert delivery channel
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Stable channel name used for counts and logging
    fn name(&self) -> &str;

    /// Deliver one alert; errors are reported, not retried.
    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Aggregate delivery counts for one channel
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChannelStats {
    pub sent: u64,
    pub failed: u64,
}

/// Fans accepted alerts out to all configured sinks
pub struct AlertDispatcher {
    sinks: Vec<Box<dyn AlertSink>>,
    stats: Mutex<BTreeMap<String, ChannelStats>>,
    metrics: MonitorMetrics,
}

impl AlertDispatcher {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        let mut stats = BTreeMap::new();
        for sink in &sinks {
            stats.insert(sink.name().to_string(), ChannelStats::default());
        }
        Self {
            sinks,
            stats: Mutex::new(stats),
            metrics: MonitorMetrics::new(),
        }
    }

    /// Deliver one alert to every sink, recording per-channel counts.
    pub async fn dispatch(&self, alert: &Alert) {
        for sink in &self.sinks {
            match sink.send(alert).await {
                Ok(()) => {
                    info!(
                        event = "alert_dispatched",
                        channel = sink.name(),
                        metric = %alert.metric,
                        title = %alert.title,
                        "Alert dispatched"
                    );
                    self.record(sink.name(), true);
                }
                Err(e) => {
                    error!(
                        event = "alert_dispatch_failed",
                        channel = sink.name(),
                        metric = %alert.metric,
                        error = %e,
                        "Failed to dispatch alert"
                    );
                    self.metrics.inc_dispatch_failures();
                    self.record(sink.name(), false);
                }
            }
        }
    }

    fn record(&self, channel: &str, success: bool) {
        let mut stats = self.stats.lock().unwrap();
        let entry = stats.entry(channel.to_string()).or_default();
        if success {
            entry.sent += 1;
        } else {
            entry.failed += 1;
        }
    }

    /// Per-channel aggregate counts for the status report.
    pub fn stats(&self) -> BTreeMap<String, ChannelStats> {
        self.stats.lock().unwrap().clone()
    }
}

/// Webhook sink configuration
#[derive(Debug, Clone)]
pub struct WebhookSinkConfig {
    pub url: String,
    /// "POST" or "PUT"
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Sends alerts as JSON to an HTTP webhook
pub struct WebhookSink {
    url: String,
    method: reqwest::Method,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookSink {
    /// Build a webhook sink; configuration problems fail here, not per send.
    pub fn new(config: WebhookSinkConfig) -> Result<Self> {
        if config.url.is_empty() {
            bail!("webhook URL is not configured");
        }

        let method = match config.method.to_ascii_uppercase().as_str() {
            "POST" => reqwest::Method::POST,
            "PUT" => reqwest::Method::PUT,
            other => bail!("unsupported webhook HTTP method: {other}"),
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build webhook HTTP client")?;

        Ok(Self {
            url: config.url,
            method,
            headers: config.headers,
            client,
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let payload = serde_json::json!({
            "level": alert.level,
            "title": alert.title,
            "message": alert.message,
            "metric": alert.metric,
            "value": alert.value,
            "threshold": alert.threshold,
            "timestamp": alert.timestamp,
        });

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .json(&payload);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        request
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook returned an error status")?;

        Ok(())
    }
}
