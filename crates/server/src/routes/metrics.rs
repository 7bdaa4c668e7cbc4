//! Prometheus metrics endpoint.
//!
//! Serves the import counters in Prometheus text format at `GET /metrics`,
//! together with gauges sampled from the import service on each scrape.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::render_metrics;
use crate::state::AppState;

/// GET /metrics - Prometheus metrics endpoint.
///
/// Returns 503 Service Unavailable if metrics are not initialized.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    metrics::gauge!("import_jobs_in_flight").set(state.imports.in_flight() as f64);
    metrics::gauge!("import_registry_entries").set(state.imports.registry().len() as f64);

    match render_metrics() {
        Some(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response(),
    }
}

/// Not nested under `/api`: `/metrics` is where Prometheus looks.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
