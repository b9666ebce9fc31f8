//! HTTP server for the Prometheus metrics and health endpoints.
//!
//! Runs on a separate tokio task: `/metrics` for Prometheus scraping and
//! `/health`, which turns 503 while the target store has unsaved changes.

use crate::state::TargetStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Handler for GET /health.
async fn health_handler(State(store): State<Arc<TargetStore>>) -> (StatusCode, &'static str) {
    if store.is_dirty() {
        (StatusCode::SERVICE_UNAVAILABLE, "store dirty")
    } else {
        (StatusCode::OK, "ok")
    }
}

fn router(store: Arc<TargetStore>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(store)
}

/// Run the HTTP server.
///
/// Binds to `0.0.0.0:port`. This is a long-running task that should be
/// spawned in the background.
pub async fn run_http_server(port: u16, store: Arc<TargetStore>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Metrics HTTP server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind HTTP server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, router(store)).await {
        tracing::error!(error = %e, "HTTP server error");
    }
}
