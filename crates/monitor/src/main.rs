//! JVM Monitor - health monitoring for JVM application servers
//!
//! Collects JVM, host, and access-log metrics on a fixed interval, scores
//! overall health, raises throttled alerts, and serves the results over a
//! small HTTP API alongside Prometheus metrics.

use anyhow::Result;
use monitor_lib::{
    alerts::{AlertDispatcher, AlertSink, WebhookSink, WebhookSinkConfig},
    source::{AccessLogSource, JvmSource, MetricSource, OsSource},
    Coordinator, MonitorMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting jvm-monitor");

    let settings = config::Settings::load()?;
    info!(
        jmx_host = %settings.jmx.host,
        jmx_port = settings.jmx.port,
        poll_interval_secs = settings.monitor.poll_interval_secs,
        "Monitor configured"
    );

    // Initialize the global metrics registry before anything records to it
    let _metrics = MonitorMetrics::new();

    let jvm = Arc::new(JvmSource::new(
        settings.jmx.host.clone(),
        settings.jmx.port,
        Duration::from_secs(settings.jmx.connection_timeout_secs),
    ));
    jvm.connect().await;

    let access_log = Arc::new(AccessLogSource::new(
        &settings.access_log.path,
        settings.access_log.slow_request_threshold_ms,
    ));

    let sources: Vec<Arc<dyn MetricSource>> =
        vec![jvm, Arc::new(OsSource::new()), access_log.clone()];

    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
    if settings.webhook.enabled {
        let sink = WebhookSink::new(WebhookSinkConfig {
            url: settings.webhook.url.clone(),
            method: settings.webhook.method.clone(),
            headers: settings.webhook.headers.clone(),
            timeout: Duration::from_secs(settings.webhook.timeout_secs),
        })?;
        info!(url = %settings.webhook.url, "Webhook alert channel enabled");
        sinks.push(Box::new(sink));
    }
    let dispatcher = Arc::new(AlertDispatcher::new(sinks));

    let coordinator = Coordinator::new(settings.monitor.clone(), sources, dispatcher)?;
    coordinator.start().await;

    let app_state = Arc::new(api::AppState::new(coordinator.clone(), access_log));
    let api_handle = tokio::spawn(api::serve(settings.server.port, app_state));

    tokio::signal::ctrl_c().await?;
    info!("SIGINT received, shutting down");

    coordinator.stop().await;
    api_handle.abort();

    Ok(())
}
