// crates/server/src/routes/members.rs
//! Member import endpoints.
//!
//! - POST /orgs/{org_id}/members?async=bool — bulk import
//! - GET  /orgs/{org_id}/members/job/{job_id} — async import status
//! - POST /orgs/{org_id}/member — single-member upsert

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rollcall_core::RawMember;
use rollcall_db::StoredMember;
use rollcall_server_jobs::{JobLookup, SubmitMode, Submission};
use rollcall_types::{JobId, Progress};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    #[serde(default, rename = "async")]
    pub run_async: bool,
}

/// Result of a synchronous (or empty) import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub added: u64,
    pub errors: Vec<String>,
}

/// Reply to an accepted async import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: JobId,
}

/// POST /api/orgs/{org_id}/members — import a batch of members.
///
/// Sync imports answer 200 with the final tally. Async imports answer 202
/// with the job id to poll. An empty batch is always a 200 with nothing added.
async fn import_members(
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
    Query(params): Query<ImportParams>,
    Json(records): Json<Vec<RawMember>>,
) -> ApiResult<Response> {
    let mode = if params.run_async {
        SubmitMode::Async
    } else {
        SubmitMode::Sync
    };

    match state.imports.submit(&org_id, records, mode).await? {
        Submission::Completed(progress) => Ok((
            StatusCode::OK,
            Json(ImportResponse {
                added: progress.added,
                errors: progress.errors,
            }),
        )
            .into_response()),
        Submission::Accepted(job_id) => {
            Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })).into_response())
        }
    }
}

/// GET /api/orgs/{org_id}/members/job/{job_id} — progress of an import job.
async fn job_status(
    State(state): State<Arc<AppState>>,
    Path((org_id, job_id)): Path<(String, String)>,
) -> ApiResult<Json<Progress>> {
    let id: JobId = job_id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid job id: {e}")))?;

    let lookup = state.imports.resolve(&org_id, &id).await?;
    if let JobLookup::Stored(_) = &lookup {
        tracing::debug!(job_id = %id, "job served from store");
    }
    lookup
        .progress()
        .map(Json)
        .ok_or(ApiError::JobNotFound(job_id))
}

/// POST /api/orgs/{org_id}/member — validate and upsert a single member.
async fn upsert_member(
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
    Json(record): Json<RawMember>,
) -> ApiResult<Json<StoredMember>> {
    let stored = state.imports.upsert_one(&org_id, &record).await?;
    Ok(Json(stored))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orgs/{org_id}/members", post(import_members))
        .route("/orgs/{org_id}/members/job/{job_id}", get(job_status))
        .route("/orgs/{org_id}/member", post(upsert_member))
}
