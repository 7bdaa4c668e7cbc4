// crates/server-jobs/src/store.rs
//! Durable storage of finished jobs.

use async_trait::async_trait;
use rollcall_db::{Database, DbResult};
use rollcall_types::{Job, JobId, JobPage, JobType};

/// Where completed jobs are kept once they leave the registry.
///
/// `save_completed` must be idempotent: saving the same job twice leaves a
/// single record. It returns `false` when the record already existed.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save_completed(&self, job: &Job) -> DbResult<bool>;

    async fn get(&self, job_id: &JobId) -> DbResult<Option<Job>>;

    async fn list(
        &self,
        org_id: &str,
        job_type: Option<JobType>,
        page: u32,
        limit: u32,
    ) -> DbResult<JobPage>;
}

#[async_trait]
impl JobStore for Database {
    async fn save_completed(&self, job: &Job) -> DbResult<bool> {
        self.insert_completed_job(job).await
    }

    async fn get(&self, job_id: &JobId) -> DbResult<Option<Job>> {
        self.get_job(job_id).await
    }

    async fn list(
        &self,
        org_id: &str,
        job_type: Option<JobType>,
        page: u32,
        limit: u32,
    ) -> DbResult<JobPage> {
        self.list_jobs(org_id, job_type, page, limit).await
    }
}
