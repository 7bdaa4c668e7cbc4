// crates/server/src/lib.rs
//! Rollcall server library.
//!
//! Axum HTTP server for bulk member imports: synchronous and background
//! imports, job status polling, and completed-job listings.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{Cli, ConfigError, ServerConfig};
pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, member imports, jobs) and `/metrics`
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
