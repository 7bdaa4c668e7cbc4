// crates/db/src/queries/jobs.rs
// Durable job records. Rows are written once, at completion, and never updated.

use rollcall_types::{Job, JobId, JobPage, JobType};

use super::row_types::JobRow;
use super::to_db_time;
use crate::{Database, DbError, DbResult};

/// Default and upper bound for `limit` in job listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

impl Database {
    /// Insert the record of a finished job.
    ///
    /// Returns `false` when a record with the same id already exists; the
    /// existing row is left untouched.
    pub async fn insert_completed_job(&self, job: &Job) -> DbResult<bool> {
        let errors = serde_json::to_string(&job.errors).map_err(|e| DbError::Corrupt {
            table: "jobs",
            message: e.to_string(),
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (job_id, job_type, org_id, total, added, errors, created_at, completed_at, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(job_id) DO NOTHING
            "#,
        )
        .bind(job.job_id.to_string())
        .bind(job.job_type.as_str())
        .bind(&job.org_id)
        .bind(job.total as i64)
        .bind(job.added as i64)
        .bind(&errors)
        .bind(to_db_time(job.created_at))
        .bind(job.completed_at.map(to_db_time))
        .bind(job.completed)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Look up a stored job by id.
    pub async fn get_job(&self, job_id: &JobId) -> DbResult<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE job_id = ?1")
            .bind(job_id.to_string())
            .fetch_optional(self.pool())
            .await?;
        row.map(JobRow::into_job).transpose()
    }

    /// One page of an organization's stored jobs, newest first.
    ///
    /// `page` is 1-based; `0` is treated as `1`. `limit` is clamped to
    /// `1..=MAX_PAGE_LIMIT`.
    pub async fn list_jobs(
        &self,
        org_id: &str,
        job_type: Option<JobType>,
        page: u32,
        limit: u32,
    ) -> DbResult<JobPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let offset = i64::from(page - 1) * i64::from(limit);
        let job_type = job_type.map(|t| t.as_str());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE org_id = ?1 AND (?2 IS NULL OR job_type = ?2)",
        )
        .bind(org_id)
        .bind(job_type)
        .fetch_one(self.pool())
        .await?;

        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE org_id = ?1 AND (?2 IS NULL OR job_type = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(org_id)
        .bind(job_type)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let jobs = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(JobPage {
            jobs,
            total: total.max(0) as u64,
            page,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rollcall_types::Progress;

    fn job(org: &str, job_type: JobType, minutes: i64) -> Job {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes);
        let last = Progress {
            total: 3,
            added: 2,
            errors: vec!["member #2: invalid email \"nope\"".into()],
            progress: 100,
            ..Progress::default()
        };
        Job::completed(JobId::generate(), job_type, org, created, created, &last)
    }

    #[tokio::test]
    async fn test_insert_and_get_job() {
        let db = Database::new_in_memory().await.unwrap();
        let job = job("org-1", JobType::OrgMembers, 0);

        assert!(db.insert_completed_job(&job).await.unwrap());
        let stored = db.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(stored, job);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        let job = job("org-1", JobType::OrgMembers, 0);
        assert!(db.insert_completed_job(&job).await.unwrap());

        let mut again = job.clone();
        again.added = 0;
        assert!(!db.insert_completed_job(&again).await.unwrap());

        let stored = db.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.added, 2);
        let page = db.list_jobs("org-1", None, 1, 10).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_job() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(db.get_job(&JobId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_jobs_pages_newest_first() {
        let db = Database::new_in_memory().await.unwrap();
        let mut ids = Vec::new();
        for minute in 0..5 {
            let j = job("org-1", JobType::OrgMembers, minute);
            ids.push(j.job_id);
            db.insert_completed_job(&j).await.unwrap();
        }
        db.insert_completed_job(&job("org-2", JobType::OrgMembers, 9))
            .await
            .unwrap();

        let first = db.list_jobs("org-1", None, 1, 2).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.page, 1);
        assert_eq!(first.limit, 2);
        let first_ids: Vec<_> = first.jobs.iter().map(|j| j.job_id).collect();
        assert_eq!(first_ids, vec![ids[4], ids[3]]);

        let last = db.list_jobs("org-1", None, 3, 2).await.unwrap();
        assert_eq!(last.jobs.len(), 1);
        assert_eq!(last.jobs[0].job_id, ids[0]);

        let past_end = db.list_jobs("org-1", None, 9, 2).await.unwrap();
        assert!(past_end.jobs.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[tokio::test]
    async fn test_list_jobs_filters_by_type() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_completed_job(&job("org-1", JobType::OrgMembers, 0))
            .await
            .unwrap();
        db.insert_completed_job(&job("org-1", JobType::CensusParticipants, 1))
            .await
            .unwrap();

        let page = db
            .list_jobs("org-1", Some(JobType::CensusParticipants), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.jobs[0].job_type, JobType::CensusParticipants);
    }

    #[tokio::test]
    async fn test_list_jobs_clamps_page_and_limit() {
        let db = Database::new_in_memory().await.unwrap();
        let page = db.list_jobs("org-1", None, 0, 0).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);

        let page = db.list_jobs("org-1", None, 1, 5000).await.unwrap();
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
    }
}
