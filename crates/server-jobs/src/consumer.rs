// crates/server-jobs/src/consumer.rs
//! Background side of an async import: drains the writer's channel into the
//! registry, then persists, arms the reaper and notifies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rollcall_types::{Job, JobId, JobType, Progress};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::notifier::Notifier;
use crate::reaper;
use crate::registry::{JobRegistry, RegistryEntry};
use crate::store::JobStore;

/// Emitted once per async job after its side effects have run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCompletion {
    pub job_id: JobId,
    pub org_id: String,
    pub progress: Progress,
    /// The durable record exists (written now or earlier).
    pub persisted: bool,
    pub notified: bool,
}

/// Identity of the job a consumer is draining.
pub(crate) struct JobContext {
    pub job_id: JobId,
    pub org_id: String,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
    pub total: u64,
}

impl JobContext {
    /// Context for the job just registered under `job_id`.
    pub(crate) fn from_entry(job_id: JobId, entry: &RegistryEntry) -> Self {
        Self {
            job_id,
            org_id: entry.org_id.clone(),
            job_type: entry.job_type,
            created_at: entry.created_at,
            total: entry.progress.total,
        }
    }
}

pub(crate) struct Consumer {
    pub registry: Arc<JobRegistry>,
    pub store: Arc<dyn JobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub completions: broadcast::Sender<JobCompletion>,
    pub reap_grace: Duration,
}

impl Consumer {
    pub(crate) async fn run(self, ctx: JobContext, mut rx: mpsc::Receiver<Progress>) {
        let started = Instant::now();
        let mut last = None;

        while let Some(mut snapshot) = rx.recv().await {
            snapshot.job_id = Some(ctx.job_id);
            self.registry.update(&ctx.job_id, snapshot.clone());
            last = Some(snapshot);
        }

        let mut progress = finish(last, ctx.total);
        progress.job_id = Some(ctx.job_id);
        self.registry.update(&ctx.job_id, progress.clone());
        record_tally(&progress);
        metrics::histogram!("import_job_duration_seconds").record(started.elapsed().as_secs_f64());

        let job = Job::completed(
            ctx.job_id,
            ctx.job_type,
            &ctx.org_id,
            ctx.created_at,
            Utc::now(),
            &progress,
        );
        let persisted = match self.store.save_completed(&job).await {
            Ok(inserted) => {
                if !inserted {
                    debug!(job_id = %ctx.job_id, "job record already stored");
                }
                true
            }
            Err(e) => {
                error!(job_id = %ctx.job_id, org_id = %ctx.org_id, error = %e, "failed to persist completed job");
                metrics::counter!("import_job_side_effect_failures_total", "kind" => "persist")
                    .increment(1);
                false
            }
        };

        // The grace period starts at completion, not after the notifier.
        if persisted {
            reaper::arm(self.registry.clone(), ctx.job_id, self.reap_grace);
        } else {
            // Without a durable record the registry is the only copy left.
            warn!(job_id = %ctx.job_id, "keeping job in registry, no durable record");
        }

        let notified = match self
            .notifier
            .job_completed(&ctx.org_id, &ctx.job_id, ctx.job_type, &progress)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(job_id = %ctx.job_id, org_id = %ctx.org_id, error = %e, "failed to notify job completion");
                metrics::counter!("import_job_side_effect_failures_total", "kind" => "notify")
                    .increment(1);
                false
            }
        };

        info!(
            job_id = %ctx.job_id,
            org_id = %ctx.org_id,
            added = progress.added,
            errors = progress.errors.len(),
            persisted,
            notified,
            "import job finished"
        );

        // No subscribers is fine.
        let _ = self.completions.send(JobCompletion {
            job_id: ctx.job_id,
            org_id: ctx.org_id,
            progress,
            persisted,
            notified,
        });
    }
}

/// Final snapshot of a job whose channel has closed.
///
/// A writer that stopped early (its task panicked) leaves records
/// unaccounted for; each of them gets an error so that `added + errors`
/// still equals `total`.
pub(crate) fn finish(last: Option<Progress>, total: u64) -> Progress {
    let mut progress = last.unwrap_or_else(|| Progress {
        total,
        ..Progress::default()
    });
    if progress.is_complete() {
        return progress;
    }

    warn!(
        processed = progress.processed(),
        total, "bulk writer stopped before the final snapshot"
    );
    for index in progress.processed()..total {
        progress
            .errors
            .push(format!("member #{}: not processed, import aborted", index + 1));
    }
    progress.total = total;
    progress.progress = 100;
    progress
}

pub(crate) fn record_tally(progress: &Progress) {
    metrics::counter!("import_records_total", "outcome" => "added").increment(progress.added);
    metrics::counter!("import_records_total", "outcome" => "rejected")
        .increment(progress.errors.len() as u64);
}
