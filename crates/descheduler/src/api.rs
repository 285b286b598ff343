//! Health, status and scrape endpoints served next to the strategy loop
//!
//! `/healthz` backs the liveness check and `/readyz` the readiness check.
//! `/status` summarizes the last run together with lifetime counters.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use descheduler_lib::{
    health::{ComponentStatus, HealthRegistry, LastRun},
    MetricTotals, StrategyMetrics,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: StrategyMetrics,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, metrics: StrategyMetrics) -> Self {
        Self {
            health_registry,
            metrics,
        }
    }
}

/// Body of `/status`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run: Option<LastRun>,
    totals: MetricTotals,
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let health = state.health_registry.health().await;
    let code = if health.status == ComponentStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(health)).into_response()
}

async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    let readiness = state.health_registry.readiness().await;
    let code = match readiness.ready {
        true => StatusCode::OK,
        false => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(readiness)).into_response()
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let health = state.health_registry.health().await;
    Json(StatusResponse {
        status: health.status,
        last_run: health.last_run,
        totals: state.metrics.totals(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode_text() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind the API port and serve until the task is aborted
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
