//! HTTP API for monitoring status and Prometheus metrics

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use monitor_lib::{source::AccessLogSource, Coordinator, HealthStatus};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub access_log: Arc<AccessLogSource>,
}

impl AppState {
    pub fn new(coordinator: Coordinator, access_log: Arc<AccessLogSource>) -> Self {
        Self {
            coordinator,
            access_log,
        }
    }
}

/// Complete status report: snapshot, health, active alerts, channel stats
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.get_current_status().await)
}

/// Latest health score, 404 before the first cycle completes
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.get_health().await {
        Some(health) => (StatusCode::OK, Json(serde_json::json!(health))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "no health score published yet"})),
        ),
    }
}

/// Latest metric snapshot, 404 before the first cycle completes
async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.get_latest_snapshot().await {
        Some(snapshot) => (StatusCode::OK, Json(serde_json::json!(snapshot))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "no metrics published yet"})),
        ),
    }
}

/// Alert log within the configured retention
async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.get_alert_log().await)
}

/// Heap samples retained by the trend predictor
async fn heap_trend(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.get_heap_trend().await)
}

#[derive(Debug, Deserialize)]
struct SlowRequestsParams {
    #[serde(default = "default_slow_limit")]
    limit: usize,
}

fn default_slow_limit() -> usize {
    50
}

/// Most recent slow requests, newest first
async fn slow_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SlowRequestsParams>,
) -> impl IntoResponse {
    Json(state.access_log.slow_requests(params.limit))
}

/// Liveness check: 503 only when the last published score is critical or
/// scoring failed. No published score yet still reports alive.
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.coordinator.get_health().await {
        Some(health) => {
            let status_code = match health.health_status {
                HealthStatus::Healthy | HealthStatus::Warning => StatusCode::OK,
                HealthStatus::Critical | HealthStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
            };
            (
                status_code,
                Json(serde_json::json!({"status": health.health_status})),
            )
        }
        None => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "starting"})),
        ),
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/health", get(health))
        .route("/api/metrics", get(snapshot))
        .route("/api/alerts", get(alerts))
        .route("/api/heap_trend", get(heap_trend))
        .route("/api/slow_requests", get(slow_requests))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
