// crates/server-jobs/src/registry.rs
//! In-memory cache of the latest progress of every live import job.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rollcall_types::{JobId, JobType, Progress};

/// What the registry knows about one job.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub org_id: String,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
    pub progress: Progress,
}

/// Latest progress per job.
///
/// Each job has exactly one writer, its background consumer, so entries are
/// plain values overwritten in place. Readers share the read lock and never
/// wait on each other.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, RegistryEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly accepted job.
    pub fn register(&self, job_id: JobId, entry: RegistryEntry) {
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(job_id, entry);
            }
            Err(e) => tracing::error!("RwLock poisoned registering job: {e}"),
        }
    }

    /// Replace the progress of a registered job. Returns `false` if the job
    /// is not (or no longer) registered.
    pub fn update(&self, job_id: &JobId, progress: Progress) -> bool {
        match self.jobs.write() {
            Ok(mut jobs) => match jobs.get_mut(job_id) {
                Some(entry) => {
                    entry.progress = progress;
                    true
                }
                None => false,
            },
            Err(e) => {
                tracing::error!("RwLock poisoned updating job: {e}");
                false
            }
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<RegistryEntry> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(job_id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                None
            }
        }
    }

    /// Drop a job whose progress has reached 100.
    ///
    /// Unfinished jobs are kept. Removing a job that is already gone is a
    /// no-op. Returns whether an entry was removed.
    pub fn remove_completed(&self, job_id: &JobId) -> bool {
        match self.jobs.write() {
            Ok(mut jobs) => {
                let complete = jobs
                    .get(job_id)
                    .is_some_and(|entry| entry.progress.is_complete());
                complete && jobs.remove(job_id).is_some()
            }
            Err(e) => {
                tracing::error!("RwLock poisoned removing job: {e}");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.jobs.read() {
            Ok(jobs) => jobs.len(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
