//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Descriptions of the import metrics recorded by `rollcall-server-jobs`
//! - Rendering for the `/metrics` endpoint

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    // Install the recorder globally
    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    // Store the handle for later rendering
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "import_records_total",
        "Imported records by outcome (added or rejected)"
    );
    describe_counter!(
        "import_jobs_total",
        "Import batches started, by mode (sync or async)"
    );
    describe_counter!(
        "import_job_side_effect_failures_total",
        "Failures persisting or notifying a finished async job, by kind"
    );
    describe_histogram!(
        "import_job_duration_seconds",
        Unit::Seconds,
        "Wall time of async import jobs from acceptance to last snapshot"
    );
    describe_gauge!(
        "import_jobs_in_flight",
        "Async import jobs whose consumer is still running"
    );
    describe_gauge!(
        "import_registry_entries",
        "Jobs held in memory, running or within their grace period"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}
