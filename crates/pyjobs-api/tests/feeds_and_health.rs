//! RSS feeds, health checks and response headers.

mod common;

use axum::http::{header, StatusCode};
use chrono::{Duration, Utc};
use pyjobs_db::JobRepository;

use common::TestApp;

#[tokio::test]
async fn test_jobs_feed_lists_public_jobs() {
    let app = TestApp::new();
    let job = app.job(None, "Feed role").await;

    let response = app.get("/feed/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/rss+xml"));

    let channel = rss::Channel::read_from(response.body.as_bytes()).unwrap();
    assert_eq!(channel.items().len(), 1);
    assert_eq!(channel.items()[0].title(), Some("Feed role"));
    assert_eq!(
        channel.items()[0].link(),
        Some(format!("http://localhost:8000/job/{}/", job.unique_slug).as_str())
    );
}

#[tokio::test]
async fn test_premium_feed_respects_the_window() {
    let app = TestApp::new();
    let now = Utc::now();
    let recent = app.job(None, "Recent premium").await;
    let expired = app.job(None, "Expired premium").await;
    app.job(None, "Regular role").await;
    app.store
        .set_job_premium(recent.id, true, Some(now - Duration::days(29)))
        .await
        .unwrap();
    app.store
        .set_job_premium(expired.id, true, Some(now - Duration::days(31)))
        .await
        .unwrap();

    let response = app.get("/feed/premium/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let channel = rss::Channel::read_from(response.body.as_bytes()).unwrap();
    let titles: Vec<&str> = channel.items().iter().filter_map(|i| i.title()).collect();
    assert_eq!(titles, vec!["Recent premium"]);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let health = app.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json()["status"], "healthy");

    let ready = app.get("/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.json()["status"], "ready");
    assert_eq!(ready.json()["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let app = TestApp::new();
    let response = app.get("/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = TestApp::new();
    let response = app.get("/job/does-not-exist/", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.contains("Not Found"));
}
