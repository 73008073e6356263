//! Monitoring coordinator
//!
//! Owns the periodic monitoring cycle: collect a snapshot from every source,
//! fold in the heap trend prediction, score, evaluate and throttle alerts,
//! dispatch what survives, and publish the cycle's results in one atomic
//! swap. Readers always see a consistent snapshot/score/alert set from the
//! same cycle, never a mix of two.

use crate::alerts::{AlertDispatcher, AlertEvaluator, AlertManager, ChannelStats};
use crate::config::MonitorConfig;
use crate::models::{epoch_seconds, Alert, HealthScore, HeapSample, MetricSnapshot};
use crate::observability::MonitorMetrics;
use crate::scoring::HealthScorer;
use crate::source::MetricSource;
use crate::trend::TrendPredictor;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// How long `stop` waits for the worker to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the status API serves, replaced wholesale once per cycle
#[derive(Debug, Default, Clone)]
struct PublishedState {
    snapshot: Option<MetricSnapshot>,
    health: Option<HealthScore>,
    alerts: Vec<Alert>,
    heap_trend: Vec<HeapSample>,
}

/// Point-in-time view served by the status API
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthScore>,
    pub active_alerts: Vec<Alert>,
    pub monitoring_active: bool,
    pub collector_connected: bool,
    pub dispatch: BTreeMap<String, ChannelStats>,
    pub timestamp: f64,
}

/// Mutable per-cycle state that must survive stop/start.
///
/// Restarting the loop must not forget heap history or re-arm alert
/// cooldowns, so this lives outside the worker task.
struct CycleState {
    trend: TrendPredictor,
    alerts: AlertManager,
}

struct WorkerHandle {
    shutdown: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

struct CoordinatorInner {
    config: MonitorConfig,
    sources: Vec<Arc<dyn MetricSource>>,
    scorer: HealthScorer,
    evaluator: AlertEvaluator,
    dispatcher: Arc<AlertDispatcher>,
    state: Mutex<CycleState>,
    published: RwLock<PublishedState>,
    running: AtomicBool,
    worker: Mutex<Option<WorkerHandle>>,
    metrics: MonitorMetrics,
}

/// Cloneable handle to the monitoring pipeline
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl Coordinator {
    /// Build a coordinator over the given sources and alert channels.
    /// Configuration is validated here; an invalid one never starts a loop.
    pub fn new(
        config: MonitorConfig,
        sources: Vec<Arc<dyn MetricSource>>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Result<Self> {
        config.validate()?;

        let scorer = HealthScorer::new(config.weights.clone(), config.thresholds.clone());
        let evaluator = AlertEvaluator::new(config.thresholds.clone());
        let state = CycleState {
            trend: TrendPredictor::new(),
            alerts: AlertManager::new(config.throttle_minutes),
        };

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                sources,
                scorer,
                evaluator,
                dispatcher,
                state: Mutex::new(state),
                published: RwLock::new(PublishedState::default()),
                running: AtomicBool::new(false),
                worker: Mutex::new(None),
                metrics: MonitorMetrics::new(),
            }),
        })
    }

    /// Start the periodic monitoring loop. Idempotent: a second call while
    /// running logs a warning and changes nothing.
    pub async fn start(&self) {
        let mut worker = self.inner.worker.lock().await;
        if worker.is_some() {
            warn!("Monitoring already running");
            return;
        }

        let (shutdown, _) = broadcast::channel(1);
        let join = tokio::spawn(run_loop(self.inner.clone(), shutdown.subscribe()));
        *worker = Some(WorkerHandle { shutdown, join });
        self.inner.running.store(true, Ordering::SeqCst);
        info!(
            interval_secs = self.inner.config.poll_interval_secs,
            "Monitoring started"
        );
    }

    /// Stop the monitoring loop and wait briefly for the worker to finish.
    /// A call while stopped logs a warning and changes nothing.
    pub async fn stop(&self) {
        let mut worker = self.inner.worker.lock().await;
        let Some(handle) = worker.take() else {
            warn!("Monitoring is not running");
            return;
        };

        self.inner.running.store(false, Ordering::SeqCst);
        let _ = handle.shutdown.send(());
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.join)
            .await
            .is_err()
        {
            warn!("Monitoring worker did not stop in time, abandoning it");
        }
        info!("Monitoring stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run a single monitoring cycle immediately, outside the loop schedule.
    pub async fn run_cycle_now(&self) {
        run_cycle(&self.inner).await;
    }

    /// Complete status view from the most recent published cycle.
    pub async fn get_current_status(&self) -> StatusReport {
        let now = epoch_seconds();
        let published = self.inner.published.read().await;
        let cutoff = now - self.inner.config.active_alert_window_secs;

        StatusReport {
            metrics: published.snapshot.clone(),
            health: published.health.clone(),
            active_alerts: published
                .alerts
                .iter()
                .filter(|a| a.timestamp > cutoff)
                .cloned()
                .collect(),
            monitoring_active: self.is_running(),
            collector_connected: self.inner.sources.iter().all(|s| s.connected()),
            dispatch: self.inner.dispatcher.stats(),
            timestamp: now,
        }
    }

    /// Accepted alerts no older than the configured log retention.
    pub async fn get_alert_log(&self) -> Vec<Alert> {
        self.inner.published.read().await.alerts.clone()
    }

    /// Accepted alerts inside the recency window used by the status report.
    pub async fn get_active_alerts(&self) -> Vec<Alert> {
        let cutoff = epoch_seconds() - self.inner.config.active_alert_window_secs;
        self.inner
            .published
            .read()
            .await
            .alerts
            .iter()
            .filter(|a| a.timestamp > cutoff)
            .cloned()
            .collect()
    }

    /// Heap samples currently retained by the trend predictor.
    pub async fn get_heap_trend(&self) -> Vec<HeapSample> {
        self.inner.published.read().await.heap_trend.clone()
    }

    /// Most recently published snapshot, if a cycle has completed.
    pub async fn get_latest_snapshot(&self) -> Option<MetricSnapshot> {
        self.inner.published.read().await.snapshot.clone()
    }

    /// Most recently published health score, if a cycle has completed.
    pub async fn get_health(&self) -> Option<HealthScore> {
        self.inner.published.read().await.health.clone()
    }
}

async fn run_loop(inner: Arc<CoordinatorInner>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = interval(inner.config.poll_interval());
    // A stalled cycle must not cause a burst of catch-up cycles
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&inner).await;
            }
            _ = shutdown.recv() => {
                info!("Shutting down monitoring loop");
                break;
            }
        }
    }
}

/// One monitoring cycle: collect, predict, score, alert, publish.
async fn run_cycle(inner: &CoordinatorInner) {
    let start = Instant::now();
    let mut snapshot = MetricSnapshot {
        timestamp: epoch_seconds(),
        ..Default::default()
    };

    // Sources are independent; one failing leaves its sections at their
    // defaults and is recorded on the snapshot.
    for source in &inner.sources {
        if let Err(e) = source.collect(&mut snapshot).await {
            warn!(source = source.name(), error = %e, "Metric source failed");
            inner.metrics.inc_collection_errors();
            snapshot
                .errors
                .insert(source.name().to_string(), format!("{e:#}"));
        }
    }

    let mut state = inner.state.lock().await;

    if snapshot.heap.max > 0 {
        state.trend.record(HeapSample {
            used: snapshot.heap.used,
            max: snapshot.heap.max,
            timestamp: snapshot.timestamp,
        });
        snapshot.oom_prediction = state
            .trend
            .predict(inner.config.oom_window_secs, snapshot.timestamp);
    }

    let health = inner.scorer.calculate(&snapshot);
    inner.metrics.set_health_score(health.overall_score);

    let mut accepted = Vec::new();
    for alert in inner.evaluator.evaluate(&snapshot) {
        if state.alerts.accept(&alert) {
            inner.metrics.inc_alerts_emitted();
            accepted.push(alert);
        } else {
            inner.metrics.inc_alerts_throttled();
        }
    }
    state
        .alerts
        .prune(snapshot.timestamp, inner.config.alert_max_age_secs);

    let alert_log = state.alerts.log().to_vec();
    let heap_trend = state.trend.samples().to_vec();
    drop(state);

    for alert in &accepted {
        inner.dispatcher.dispatch(alert).await;
    }

    // Single swap so readers never see results from two different cycles
    *inner.published.write().await = PublishedState {
        snapshot: Some(snapshot),
        health: Some(health),
        alerts: alert_log,
        heap_trend,
    };

    inner.metrics.observe_cycle_latency(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HeapMetrics;
    use anyhow::bail;
    use async_trait::async_trait;

    struct FixedHeapSource {
        usage_percent: f64,
    }

    #[async_trait]
    impl MetricSource for FixedHeapSource {
        fn name(&self) -> &str {
            "fixed_heap"
        }

        async fn collect(&self, snapshot: &mut MetricSnapshot) -> Result<()> {
            let max = 1_000_000_000u64;
            snapshot.heap = HeapMetrics {
                used: (max as f64 * self.usage_percent) as u64,
                max,
                committed: max,
                usage_percent: self.usage_percent,
                timestamp: snapshot.timestamp,
            };
            Ok(())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl MetricSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn collect(&self, _snapshot: &mut MetricSnapshot) -> Result<()> {
            bail!("connection refused")
        }

        fn connected(&self) -> bool {
            false
        }
    }

    fn coordinator(sources: Vec<Arc<dyn MetricSource>>) -> Coordinator {
        Coordinator::new(
            MonitorConfig::default(),
            sources,
            Arc::new(AlertDispatcher::new(Vec::new())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = MonitorConfig::default();
        config.poll_interval_secs = 0;
        assert!(Coordinator::new(
            config,
            Vec::new(),
            Arc::new(AlertDispatcher::new(Vec::new()))
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_is_safe() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.5 })]);
        assert!(!c.is_running());

        c.start().await;
        assert!(c.is_running());
        // Second start is a no-op
        c.start().await;
        assert!(c.is_running());

        c.stop().await;
        assert!(!c.is_running());
        // Second stop is a no-op
        c.stop().await;
        assert!(!c.is_running());
    }

    #[tokio::test]
    async fn test_cycle_publishes_snapshot_and_health() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.5 })]);
        assert!(c.get_latest_snapshot().await.is_none());

        c.run_cycle_now().await;

        let snapshot = c.get_latest_snapshot().await.unwrap();
        assert_eq!(snapshot.heap.usage_percent, 0.5);
        assert!(snapshot.errors.is_empty());

        let health = c.get_health().await.unwrap();
        assert!(health.overall_score > 0.0);
        assert_eq!(health.timestamp, snapshot.timestamp);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_block_others() {
        let c = coordinator(vec![
            Arc::new(BrokenSource),
            Arc::new(FixedHeapSource { usage_percent: 0.5 }),
        ]);

        c.run_cycle_now().await;

        let snapshot = c.get_latest_snapshot().await.unwrap();
        // The healthy source still filled its section
        assert_eq!(snapshot.heap.usage_percent, 0.5);
        assert!(snapshot.errors["broken"].contains("connection refused"));

        // A failed probe-style source marks the collector disconnected
        let status = c.get_current_status().await;
        assert!(!status.collector_connected);
    }

    #[tokio::test]
    async fn test_critical_heap_produces_an_active_alert() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.95 })]);
        c.run_cycle_now().await;

        let alerts = c.get_active_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "heap_usage");
        assert_eq!(alerts[0].title, "Critical Heap Usage");
    }

    #[tokio::test]
    async fn test_repeat_cycles_are_throttled() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.95 })]);
        c.run_cycle_now().await;
        c.run_cycle_now().await;
        c.run_cycle_now().await;

        // One accepted alert despite three alerting cycles
        assert_eq!(c.get_alert_log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_throttle_state_survives_stop_start() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.95 })]);
        c.run_cycle_now().await;
        assert_eq!(c.get_alert_log().await.len(), 1);

        c.start().await;
        c.stop().await;

        // Restarting must not re-arm the cooldown
        c.run_cycle_now().await;
        assert_eq!(c.get_alert_log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_heap_trend_accumulates_across_cycles() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.5 })]);
        c.run_cycle_now().await;
        c.run_cycle_now().await;

        assert_eq!(c.get_heap_trend().await.len(), 2);
    }

    #[tokio::test]
    async fn test_status_before_first_cycle_is_empty() {
        let c = coordinator(vec![Arc::new(FixedHeapSource { usage_percent: 0.5 })]);
        let status = c.get_current_status().await;
        assert!(status.metrics.is_none());
        assert!(status.health.is_none());
        assert!(status.active_alerts.is_empty());
        assert!(!status.monitoring_active);
    }
}
