// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Async imports whose consumer has not finished yet.
    pub in_flight_jobs: usize,
    /// Jobs still answered from memory, including finished ones in their
    /// grace period.
    pub live_jobs: usize,
}

/// GET /api/health - server status, import load and uptime.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            "degraded"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        in_flight_jobs: state.imports.in_flight(),
        live_jobs: state.imports.registry().len(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
