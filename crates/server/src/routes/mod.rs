//! API route handlers for the rollcall server.

pub mod health;
pub mod jobs;
pub mod members;
pub mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/orgs/{org_id}/members?async= - Bulk member import
/// - GET  /api/orgs/{org_id}/members/job/{job_id} - Import job status
/// - POST /api/orgs/{org_id}/member - Single member upsert
/// - GET  /api/orgs/{org_id}/jobs?page=&limit=&type= - Completed job listing
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", members::router())
        .nest("/api", jobs::router())
        .merge(metrics::router())
        .with_state(state)
}
