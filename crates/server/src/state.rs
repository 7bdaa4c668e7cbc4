// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use rollcall_db::Database;
use rollcall_server_jobs::{ImportConfig, ImportService};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Database handle for member and job queries.
    pub db: Database,
    /// Import submission, job registry and background consumers.
    pub imports: Arc<ImportService>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(db: Database) -> Arc<Self> {
        Self::with_config(db, ImportConfig::default())
    }

    pub fn with_config(db: Database, config: ImportConfig) -> Arc<Self> {
        let imports = Arc::new(ImportService::new(db.clone(), config));
        Self::with_imports(db, imports)
    }

    /// Create with an externally-owned import service, so the caller can
    /// drain its background jobs on shutdown.
    pub fn with_imports(db: Database, imports: Arc<ImportService>) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            imports,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
