//! End-to-end import flows over the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use rollcall_db::Database;
use rollcall_server::{create_app, AppState};
use rollcall_server_jobs::{ImportConfig, JobCompletion};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tower::ServiceExt;

async fn state_with_grace(reap_grace: Duration) -> Arc<AppState> {
    let db = Database::new_in_memory().await.expect("in-memory DB");
    AppState::with_config(
        db,
        ImportConfig {
            reap_grace,
            ..ImportConfig::default()
        },
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn member(number: &str) -> Value {
    json!({
        "memberNumber": number,
        "name": "Ada",
        "surname": "Lovelace",
        "email": format!("ada{number}@example.com"),
        "phone": "+44 20 7946 0000",
        "birthDate": "1815-12-10",
        "password": "analytical"
    })
}

async fn wait_for(rx: &mut broadcast::Receiver<JobCompletion>, job_id: &str) -> JobCompletion {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("completion channel closed");
            if event.job_id.to_string() == job_id {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for job completion")
}

async fn poll_until_done(app: &Router, uri: &str) -> Value {
    for _ in 0..250 {
        let (status, json) = send(app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        if json["progress"] == 100 {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job at {uri} never completed");
}

#[tokio::test]
async fn sync_import_of_two_good_records() {
    let state = state_with_grace(Duration::from_secs(60)).await;
    let app = create_app(state.clone());

    let (status, json) = send(
        &app,
        post("/api/orgs/acme/members", json!([member("1"), member("2")])),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"added": 2, "errors": []}));
    assert_eq!(state.db.list_members("acme").await.unwrap().len(), 2);
}

#[tokio::test]
async fn sync_import_reports_each_bad_field() {
    let state = state_with_grace(Duration::from_secs(60)).await;
    let app = create_app(state);

    let mut bad_email = member("1");
    bad_email["email"] = json!("invalid-email");
    let mut bad_phone = member("2");
    bad_phone["phone"] = json!("invalid-phone");
    let mut bad_date = member("3");
    bad_date["birthDate"] = json!("invalid-birthdate");

    let (status, json) = send(
        &app,
        post(
            "/api/orgs/acme/members?async=false",
            json!([bad_email, bad_phone, bad_date]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["added"], 0);
    let errors: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].contains("invalid-email"));
    assert!(errors[1].contains("invalid-phone"));
    assert!(errors[2].contains("invalid-birthdate"));
}

#[tokio::test]
async fn async_job_is_served_from_store_after_reaping() {
    let state = state_with_grace(Duration::from_millis(300)).await;
    let app = create_app(state.clone());

    let (status, json) = send(
        &app,
        post(
            "/api/orgs/acme/members?async=true",
            json!([member("1"), member("2")]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = json["jobId"].as_str().unwrap().to_string();
    let status_uri = format!("/api/orgs/acme/members/job/{job_id}");

    let live = poll_until_done(&app, &status_uri).await;
    assert_eq!(live["added"], 2);
    assert_eq!(live["total"], 2);

    // Past the grace period the registry entry is gone, the answer is not.
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(state.imports.registry().is_empty());

    let (status, stored) = send(&app, get(&status_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored, live);
}

#[tokio::test]
async fn empty_batch_creates_nothing() {
    let state = state_with_grace(Duration::from_secs(60)).await;
    let app = create_app(state.clone());

    for uri in ["/api/orgs/acme/members", "/api/orgs/acme/members?async=true"] {
        let (status, json) = send(&app, post(uri, json!([]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["added"], 0);
        assert!(json.get("jobId").is_none());
    }

    assert!(state.imports.registry().is_empty());
    let (_, page) = send(&app, get("/api/orgs/acme/jobs")).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn concurrent_async_jobs_complete_independently() {
    let state = state_with_grace(Duration::from_secs(60)).await;
    let app = create_app(state.clone());
    let mut completions = state.imports.subscribe();

    let (first, second) = tokio::join!(
        send(
            &app,
            post("/api/orgs/acme/members?async=true", json!([member("1")]))
        ),
        send(
            &app,
            post("/api/orgs/acme/members?async=true", json!([member("2")]))
        ),
    );
    assert_eq!(first.0, StatusCode::ACCEPTED);
    assert_eq!(second.0, StatusCode::ACCEPTED);
    let ids = [
        first.1["jobId"].as_str().unwrap().to_string(),
        second.1["jobId"].as_str().unwrap().to_string(),
    ];
    assert_ne!(ids[0], ids[1]);

    // Completions arrive in whatever order the jobs finish.
    state.imports.shutdown().await;
    let mut finished = Vec::new();
    while let Ok(done) = completions.try_recv() {
        assert_eq!(done.progress.added, 1);
        assert_eq!(done.progress.total, 1);
        assert!(done.persisted);
        finished.push(done.job_id.to_string());
    }
    finished.sort();
    let mut expected = ids.to_vec();
    expected.sort();
    assert_eq!(finished, expected);

    let (status, page) = send(&app, get("/api/orgs/acme/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    let jobs = page["jobs"].as_array().unwrap();
    let listed: Vec<&str> = jobs.iter().map(|j| j["jobId"].as_str().unwrap()).collect();
    assert!(listed.contains(&ids[0].as_str()));
    assert!(listed.contains(&ids[1].as_str()));
    assert!(jobs[0]["createdAt"].as_str().unwrap() >= jobs[1]["createdAt"].as_str().unwrap());
    assert_eq!(state.db.list_members("acme").await.unwrap().len(), 2);
}

#[tokio::test]
async fn status_is_scoped_to_the_owning_org() {
    let state = state_with_grace(Duration::from_secs(60)).await;
    let app = create_app(state.clone());
    let mut completions = state.imports.subscribe();

    let (_, json) = send(
        &app,
        post("/api/orgs/acme/members?async=true", json!([member("1")])),
    )
    .await;
    let job_id = json["jobId"].as_str().unwrap().to_string();
    wait_for(&mut completions, &job_id).await;

    let (status, _) = send(&app, get(&format!("/api/orgs/globex/members/job/{job_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, page) = send(&app, get("/api/orgs/globex/jobs")).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn completed_job_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollcall.db");

    let job_id = {
        let db = Database::new(&path).await.unwrap();
        let state = AppState::with_config(db.clone(), ImportConfig::default());
        let app = create_app(state.clone());
        let mut completions = state.imports.subscribe();

        let mut bad = member("2");
        bad["email"] = json!("invalid-email");
        let (_, json) = send(
            &app,
            post("/api/orgs/acme/members?async=true", json!([member("1"), bad])),
        )
        .await;
        let job_id = json["jobId"].as_str().unwrap().to_string();
        wait_for(&mut completions, &job_id).await;
        state.imports.shutdown().await;
        db.pool().close().await;
        job_id
    };

    // Fresh process: empty registry, same file.
    let db = Database::new(&path).await.unwrap();
    let state = AppState::new(db);
    assert!(state.imports.registry().is_empty());
    let app = create_app(state);

    let (status, json) = send(&app, get(&format!("/api/orgs/acme/members/job/{job_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["jobId"], job_id.as_str());
    assert_eq!(json["progress"], 100);
    assert_eq!(json["total"], 2);
    assert_eq!(json["added"], 1);
    assert!(json["errors"][0].as_str().unwrap().contains("invalid-email"));

    let (_, page) = send(&app, get("/api/orgs/acme/jobs?type=org_members")).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["jobs"][0]["completed"], true);
}
