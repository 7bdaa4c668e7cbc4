// crates/server-jobs/src/notifier.rs
//! Hook for telling the outside world that an import finished.

use async_trait::async_trait;
use rollcall_types::{JobId, JobType, Progress};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receives the final snapshot of every async import.
///
/// Delivery failures are reported back but never change the job's outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn job_completed(
        &self,
        org_id: &str,
        job_id: &JobId,
        job_type: JobType,
        progress: &Progress,
    ) -> Result<(), NotifyError>;
}

/// Default notifier: writes one log line per finished job.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn job_completed(
        &self,
        org_id: &str,
        job_id: &JobId,
        job_type: JobType,
        progress: &Progress,
    ) -> Result<(), NotifyError> {
        info!(
            org_id,
            job_id = %job_id,
            job_type = %job_type,
            added = progress.added,
            errors = progress.errors.len(),
            "import job completed"
        );
        Ok(())
    }
}
