// Loxwatch Exporter - HTTP endpoints
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! HTTP surface of the exporter: metrics scrape, probes and status.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use loxwatch::DispatchStats;
use prometheus::Registry;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ExporterError;
use crate::metrics::{encode_metrics, set_registered_states};

/// Application state shared across handlers.
pub struct AppState {
    registry: Registry,
    stats: Arc<DispatchStats>,
    registered_states: AtomicUsize,
    start_time: Instant,
}

impl AppState {
    pub fn new(registry: Registry, stats: Arc<DispatchStats>) -> Self {
        Self {
            registry,
            stats,
            registered_states: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Counters the dispatcher reports into
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Publish the size of the state registry once it is built
    pub fn set_registered_states(&self, count: usize) {
        self.registered_states.store(count, Ordering::Relaxed);
        set_registered_states(count);
    }
}

/// Build the exporter router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Serve `listener` until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(), ExporterError> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("HTTP server shutting down");
        })
        .await
        .map_err(ExporterError::Serve)
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Loxwatch Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Loxwatch Exporter</h1>
    <p>Prometheus exporter for Loxone Miniserver state changes.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div><a href="/health">/health</a> - Health check</div>
        <div><a href="/ready">/ready</a> - Readiness check</div>
        <div><a href="/status">/status</a> - Status information (JSON)</div>
    </div>

    <h2>Metrics</h2>
    <ul>
        <li><code>loxone_values</code> - Current value per state</li>
        <li><code>loxone_changes</code> - Debounced change count per state</li>
        <li><code>loxone_exporter_registered_states</code> - Mapped state identifiers</li>
    </ul>
</body>
</html>"#,
    )
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match encode_metrics(&state.registry) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready once the dispatcher consumes events.
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.stats.is_running() {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
    }
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    registered_states: usize,
    events_routed: u64,
    events_unknown: u64,
    dispatcher_running: bool,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        registered_states: state.registered_states.load(Ordering::Relaxed),
        events_routed: state.stats.routed(),
        events_unknown: state.stats.unknown(),
        dispatcher_running: state.stats.is_running(),
    })
}
