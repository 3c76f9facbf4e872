//! HTTP server for the daemon's read-only endpoints.
//!
//! - `/metrics`: Prometheus text format for scraping
//! - `/status`: JSON view of every session and the login queue
//! - `/readyz`: 200 once at least one session has settled, 503 before

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::fleet::{Fleet, SessionSummary};
use crate::store::AccountId;

/// Body of `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct FleetStatus {
    pub online: usize,
    pub ready: usize,
    pub queued: Vec<AccountId>,
    pub sessions: Vec<SessionSummary>,
}

impl FleetStatus {
    pub fn collect(fleet: &Fleet) -> Self {
        let sessions = fleet.summaries();
        Self {
            online: sessions.iter().filter(|s| s.online).count(),
            ready: sessions.iter().filter(|s| s.phase == "ready").count(),
            queued: fleet.queued_logins(),
            sessions,
        }
    }
}

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

async fn status_handler(State(fleet): State<Fleet>) -> Json<FleetStatus> {
    Json(FleetStatus::collect(&fleet))
}

async fn ready_handler(State(fleet): State<Fleet>) -> StatusCode {
    if FleetStatus::collect(&fleet).ready > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub fn router(fleet: Fleet) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .route("/readyz", get(ready_handler))
        .with_state(fleet)
}

/// Serve the endpoints on `0.0.0.0:port` until the task is dropped.
pub async fn run_http_server(port: u16, fleet: Fleet) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind status server");
            return;
        }
    };
    tracing::info!(%addr, "status server listening");

    if let Err(e) = axum::serve(listener, router(fleet)).await {
        tracing::error!(error = %e, "status server stopped");
    }
}
