use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use wdd_core::job_queue::JobQueue;
use wdd_core::models::FingerprintKey;
use wdd_core::traits::FingerprintStore;

use crate::integration::common::{TestApp, setup_test_app};

const URL: &str = "example.org";

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn seed(app: &TestApp, timestamp: &str, simhash: &str) {
    app.db
        .fingerprint_repo()
        .set(
            &FingerprintKey::new(URL, timestamp),
            simhash,
            Duration::from_secs(600),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn calculate_starts_then_reports_pending() {
    let app = setup_test_app().await;

    let (status, first) = get(&app, "/calculate-simhash?url=example.org&year=2020").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "started");
    let job_id = first["job_id"].as_str().unwrap().to_string();

    let (status, second) = get(&app, "/calculate-simhash?url=example.org&year=2020").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "PENDING");
    assert_eq!(second["job_id"], job_id.as_str());
}

#[tokio::test]
async fn calculate_validates_params() {
    let app = setup_test_app().await;

    let (status, json) = get(&app, "/calculate-simhash?year=2020").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("URL is required"));

    let (status, _) = get(&app, "/calculate-simhash?url=example.org&year=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/calculate-simhash?url=example.org").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn simhash_by_timestamp() {
    let app = setup_test_app().await;
    seed(&app, "20200101000000", "AQIDBAUGBwg=").await;

    let (status, json) = get(&app, "/simhash?url=example.org&timestamp=20200101000000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["simhash"], "AQIDBAUGBwg=");

    let (status, json) = get(&app, "/simhash?url=example.org&timestamp=20200102000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "CAPTURE_NOT_FOUND");
}

#[tokio::test]
async fn simhash_by_year_lists_only_that_year() {
    let app = setup_test_app().await;
    seed(&app, "20201231000000", "Cg==").await;
    seed(&app, "20200101000000", "Cw==").await;
    seed(&app, "20190101000000", "DA==").await;

    let (status, json) = get(&app, "/simhash?url=example.org&year=2020").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!([["20200101000000", "Cw=="], ["20201231000000", "Cg=="]])
    );
}

#[tokio::test]
async fn simhash_by_year_compressed_reports_job_status() {
    let app = setup_test_app().await;
    seed(&app, "20200101000000", "Cw==").await;

    let (status, json) = get(&app, "/simhash?url=example.org&year=2020&compress=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["status"], "COMPLETE");
    assert_eq!(json["captures"][0][0], "20200101000000");

    app.db.job_repo().enqueue(URL, 2020).await.unwrap();
    let (_, json) = get(&app, "/simhash?url=example.org&year=2020&compress=1").await;
    assert_eq!(json["status"], "PENDING");
}

#[tokio::test]
async fn simhash_by_year_not_captured() {
    let app = setup_test_app().await;
    seed(&app, "20190101000000", "DA==").await;

    let (status, json) = get(&app, "/simhash?url=example.org&year=2020").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "NOT_CAPTURED");
}

#[tokio::test]
async fn simhash_requires_timestamp_or_year() {
    let app = setup_test_app().await;

    let (status, json) = get(&app, "/simhash?url=example.org").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("Either timestamp or year is required")
    );

    let (status, _) = get(&app, "/simhash?url=example.org&timestamp=2020").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn job_status_and_cancel() {
    let app = setup_test_app().await;

    let (_, started) = get(&app, "/calculate-simhash?url=example.org&year=2020").await;
    let job_id = started["job_id"].as_str().unwrap().to_string();

    let (status, json) = get(&app, &format!("/job?job_id={job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["job_id"], job_id.as_str());
    assert_eq!(json["url"], URL);
    assert_eq!(json["year"], 2020);

    let delete = Request::delete(format!("/job?job_id={job_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = get(&app, &format!("/job?job_id={job_id}")).await;
    assert_eq!(json["status"], "cancelled");

    let delete = Request::delete(format!("/job?job_id={job_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, delete).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "conflict");
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let app = setup_test_app().await;

    let (status, json) = get(
        &app,
        "/job?job_id=00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, _) = get(&app, "/job?job_id=not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let (status, json) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/calculate-simhash"].is_object());
}
