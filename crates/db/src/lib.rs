// crates/db/src/lib.rs
// SQLite storage for rollcall: members, completed jobs, and the bulk writer.

pub mod bulk_writer;
mod migrations;
mod queries;

pub use bulk_writer::{BulkWriter, CHANNEL_CAPACITY, PROGRESS_CHUNK};
pub use queries::jobs::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use queries::members::{MemberUpsert, StoredMember};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::info;

/// Pool size for both file and in-memory databases.
pub const MAX_CONNECTIONS: u32 = 8;

/// Connections bulk writers may hold at once. The rest stay free for status
/// lookups, listings and job persistence.
pub const WRITER_SLOTS: usize = 6;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    /// The record matches more than one distinct stored member, so writing
    /// it would merge two logical entities.
    #[error("update would create duplicates: {0}")]
    WouldCreateDuplicates(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflicting member: {0}")]
    Conflict(String),

    #[error("Corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
    writers: Arc<Semaphore>,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(
                tracing::log::LevelFilter::Warn,
                std::time::Duration::from_secs(5),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
            writers: Arc::new(Semaphore::new(WRITER_SLOTS)),
        };
        db.run_migrations().await?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database. Without this, each connection gets its own
    /// separate database and a bulk writer would write somewhere the status
    /// queries never look.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
            writers: Arc::new(Semaphore::new(WRITER_SLOTS)),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `<data dir>/rollcall/rollcall.db`
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already been
    /// applied, so each statement runs exactly once per database.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Admission gate shared by every bulk writer on this database.
    pub(crate) fn writer_slots(&self) -> Arc<Semaphore> {
        self.writers.clone()
    }

    /// Get the path to the database file.
    /// Returns an empty path for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Returns the default database path: `<data dir>/rollcall/rollcall.db`
pub fn default_db_path() -> DbResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("rollcall").join("rollcall.db"))
        .ok_or(DbError::NoDataDir)
}
