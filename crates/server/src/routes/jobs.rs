// crates/server/src/routes/jobs.rs
//! GET /orgs/{org_id}/jobs — paginated listing of completed import jobs.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use rollcall_db::DEFAULT_PAGE_LIMIT;
use rollcall_types::{JobPage, JobType};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
}

/// GET /api/orgs/{org_id}/jobs — newest first, optionally filtered by type.
async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
    Query(params): Query<ListJobsParams>,
) -> ApiResult<Json<JobPage>> {
    let job_type = params
        .job_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(str::parse::<JobType>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let page = state
        .imports
        .list_jobs(
            &org_id,
            job_type,
            params.page.unwrap_or(1),
            params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/orgs/{org_id}/jobs", get(list_jobs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use rollcall_db::Database;
    use rollcall_types::{Job, JobId, Progress};
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn app_with_jobs(jobs: &[(&str, JobType)]) -> Router {
        let db = Database::new_in_memory().await.unwrap();
        for (org, job_type) in jobs {
            let last = Progress {
                total: 1,
                added: 1,
                progress: 100,
                ..Progress::default()
            };
            let now = Utc::now();
            let job = Job::completed(JobId::generate(), *job_type, *org, now, now, &last);
            db.insert_completed_job(&job).await.unwrap();
        }
        let state = AppState::new(db);
        Router::new().nest("/api", router()).with_state(state)
    }

    #[tokio::test]
    async fn test_list_jobs_defaults() {
        let app = app_with_jobs(&[
            ("org-1", JobType::OrgMembers),
            ("org-1", JobType::CensusParticipants),
            ("org-2", JobType::OrgMembers),
        ])
        .await;
        let (status, json) = get(app, "/api/orgs/org-1/jobs").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 2);
        assert_eq!(json["page"], 1);
        assert_eq!(json["limit"], DEFAULT_PAGE_LIMIT);
        assert_eq!(json["jobs"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_jobs_type_filter() {
        let app = app_with_jobs(&[
            ("org-1", JobType::OrgMembers),
            ("org-1", JobType::CensusParticipants),
        ])
        .await;
        let (status, json) = get(app, "/api/orgs/org-1/jobs?type=census_participants&limit=5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["limit"], 5);
        assert_eq!(json["jobs"][0]["jobType"], "census_participants");
    }

    #[tokio::test]
    async fn test_list_jobs_rejects_unknown_type() {
        let app = app_with_jobs(&[]).await;
        let (status, json) = get(app, "/api/orgs/org-1/jobs?type=payroll").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["details"].as_str().unwrap().contains("payroll"));
    }
}
