// crates/server/src/main.rs
//! Rollcall server binary.
//!
//! Opens the database, serves the HTTP API until Ctrl-C, then waits for any
//! background import jobs to finish before exiting.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_db::Database;
use rollcall_server::{create_app, init_metrics, AppState, Cli, ServerConfig};
use rollcall_server_jobs::ImportService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_cli(Cli::parse())?;

    init_metrics();

    let db = match &config.db_path {
        Some(path) => Database::new(path).await,
        None => Database::open_default().await,
    }
    .context("failed to open database")?;

    let imports = Arc::new(ImportService::new(db.clone(), config.import.clone()));
    let app = create_app(AppState::with_imports(db, imports.clone()));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "rollcall listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    imports.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, draining import jobs");
}
