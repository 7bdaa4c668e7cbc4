// crates/server-jobs/src/service.rs
//! Entry point for member imports: sync and async submission, job status
//! resolution and listings.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rollcall_core::{normalize_member, RawMember, ValidationRules};
use rollcall_db::{BulkWriter, Database, DbError, StoredMember};
use rollcall_types::{Job, JobId, JobPage, JobType, Progress};
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::consumer::{finish, record_tally, Consumer, JobCompletion, JobContext};
use crate::error::{ImportError, ImportResult};
use crate::notifier::{LogNotifier, Notifier};
use crate::reaper::DEFAULT_REAP_GRACE;
use crate::registry::{JobRegistry, RegistryEntry};
use crate::store::JobStore;

/// Largest batch accepted by default.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

/// Salt used when none is configured. Fine for development only.
pub const DEV_PASSWORD_SALT: &[u8] = b"rollcall-dev-salt";

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub reap_grace: Duration,
    pub password_salt: Vec<u8>,
    pub max_batch_size: usize,
    pub rules: ValidationRules,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            reap_grace: DEFAULT_REAP_GRACE,
            password_salt: DEV_PASSWORD_SALT.to_vec(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            rules: ValidationRules::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Write the whole batch before answering.
    Sync,
    /// Answer with a job id right away and write in the background.
    Async,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Final snapshot of a batch written synchronously (or of an empty batch).
    Completed(Progress),
    /// The batch is being written in the background under this id.
    Accepted(JobId),
}

/// Result of [`ImportService::resolve`], in lookup order.
#[derive(Debug, Clone, PartialEq)]
pub enum JobLookup {
    /// Still in the registry: running, or finished within the grace period.
    Live(Progress),
    /// Reaped or from before a restart; served from the job store.
    Stored(Job),
    NotFound,
}

impl JobLookup {
    pub fn progress(&self) -> Option<Progress> {
        match self {
            Self::Live(progress) => Some(progress.clone()),
            Self::Stored(job) => Some(job.to_progress()),
            Self::NotFound => None,
        }
    }
}

/// Owns the registry, the job store and every background consumer.
pub struct ImportService {
    db: Database,
    writer: BulkWriter,
    registry: Arc<JobRegistry>,
    store: Arc<dyn JobStore>,
    notifier: Arc<dyn Notifier>,
    config: ImportConfig,
    tracker: TaskTracker,
    completions: broadcast::Sender<JobCompletion>,
}

impl ImportService {
    /// Service backed by `db` for both members and jobs, logging completions.
    pub fn new(db: Database, config: ImportConfig) -> Self {
        let store: Arc<dyn JobStore> = Arc::new(db.clone());
        Self::with_collaborators(db, store, Arc::new(LogNotifier), config)
    }

    pub fn with_collaborators(
        db: Database,
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn Notifier>,
        config: ImportConfig,
    ) -> Self {
        let (completions, _) = broadcast::channel(64);
        Self {
            writer: BulkWriter::new(db.clone(), config.rules.clone()),
            db,
            registry: Arc::new(JobRegistry::new()),
            store,
            notifier,
            config,
            tracker: TaskTracker::new(),
            completions,
        }
    }

    /// Import `records` into `org_id`.
    ///
    /// An empty batch completes immediately with zero progress and leaves no
    /// trace. Batch-level failures are returned before any job id exists.
    pub async fn submit(
        &self,
        org_id: &str,
        records: Vec<RawMember>,
        mode: SubmitMode,
    ) -> ImportResult<Submission> {
        if records.is_empty() {
            return Ok(Submission::Completed(Progress::default()));
        }
        if records.len() > self.config.max_batch_size {
            return Err(ImportError::BatchTooLarge {
                size: records.len(),
                limit: self.config.max_batch_size,
            });
        }

        let total = records.len() as u64;
        let mut rx = self
            .writer
            .start(org_id, records, &self.config.password_salt)
            .await?;

        match mode {
            SubmitMode::Sync => {
                metrics::counter!("import_jobs_total", "mode" => "sync").increment(1);
                let mut last = None;
                while let Some(snapshot) = rx.recv().await {
                    last = Some(snapshot);
                }
                let progress = finish(last, total);
                record_tally(&progress);
                Ok(Submission::Completed(progress))
            }
            SubmitMode::Async => {
                metrics::counter!("import_jobs_total", "mode" => "async").increment(1);
                let job_id = JobId::generate();

                let entry = RegistryEntry {
                    org_id: org_id.to_owned(),
                    job_type: JobType::OrgMembers,
                    created_at: Utc::now(),
                    progress: Progress::started(job_id, total),
                };
                let ctx = JobContext::from_entry(job_id, &entry);
                self.registry.register(job_id, entry);

                let consumer = Consumer {
                    registry: self.registry.clone(),
                    store: self.store.clone(),
                    notifier: self.notifier.clone(),
                    completions: self.completions.clone(),
                    reap_grace: self.config.reap_grace,
                };
                self.tracker.spawn(consumer.run(ctx, rx));

                info!(job_id = %job_id, org_id, total, "import job accepted");
                Ok(Submission::Accepted(job_id))
            }
        }
    }

    /// Status of a job owned by `org_id`: registry first, then the job store.
    ///
    /// A job that belongs to another organization is reported as not found.
    pub async fn resolve(&self, org_id: &str, job_id: &JobId) -> ImportResult<JobLookup> {
        if let Some(entry) = self.registry.get(job_id) {
            if entry.org_id == org_id {
                return Ok(JobLookup::Live(entry.progress));
            }
            return Ok(JobLookup::NotFound);
        }

        match self.store.get(job_id).await? {
            Some(job) if job.org_id == org_id => Ok(JobLookup::Stored(job)),
            _ => Ok(JobLookup::NotFound),
        }
    }

    /// Completed jobs of `org_id`, newest first.
    pub async fn list_jobs(
        &self,
        org_id: &str,
        job_type: Option<JobType>,
        page: u32,
        limit: u32,
    ) -> ImportResult<JobPage> {
        Ok(self.store.list(org_id, job_type, page, limit).await?)
    }

    /// Validate and upsert a single member synchronously.
    pub async fn upsert_one(&self, org_id: &str, raw: &RawMember) -> ImportResult<StoredMember> {
        let member = normalize_member(0, raw, &self.config.password_salt, &self.config.rules)?;
        let id = self.db.upsert_member(org_id, &member).await?.id();
        let stored = self.db.get_member(org_id, id).await?;
        stored.ok_or_else(|| {
            ImportError::Storage(DbError::Corrupt {
                table: "members",
                message: format!("member {id} missing right after upsert"),
            })
        })
    }

    /// Completion events of async jobs, one per job.
    pub fn subscribe(&self) -> broadcast::Receiver<JobCompletion> {
        self.completions.subscribe()
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Number of background consumers still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every background consumer to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            warn!(pending, "waiting for import jobs to finish");
        }
        self.tracker.wait().await;
    }
}
