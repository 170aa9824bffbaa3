//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "pyjobs_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "pyjobs_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "pyjobs_http_requests_in_flight";

    // Lifecycle metrics
    pub const APPLICATIONS_CREATED_TOTAL: &str = "pyjobs_applications_created_total";
    pub const JOBS_CLOSED_TOTAL: &str = "pyjobs_jobs_closed_total";
    pub const CLOSE_LINKS_REJECTED_TOTAL: &str = "pyjobs_close_links_rejected_total";
    pub const FEEDBACK_SENT_TOTAL: &str = "pyjobs_feedback_sent_total";
    pub const JOBS_POSTED_TOTAL: &str = "pyjobs_jobs_posted_total";

    // Notifications
    pub const NOTIFICATIONS_TOTAL: &str = "pyjobs_notifications_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "pyjobs_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a new application.
pub fn record_application_created(challenging: bool) {
    let labels = [("challenge", challenging.to_string())];
    counter!(names::APPLICATIONS_CREATED_TOTAL, &labels).increment(1);
}

/// Record a job posted through the form.
pub fn record_job_posted() {
    counter!(names::JOBS_POSTED_TOTAL).increment(1);
}

/// Record a job closed through its close link.
pub fn record_job_closed() {
    counter!(names::JOBS_CLOSED_TOTAL).increment(1);
}

/// Record a close link whose hash did not verify.
pub fn record_close_rejected() {
    counter!(names::CLOSE_LINKS_REJECTED_TOTAL).increment(1);
}

/// Record feedback sent to an applicant.
pub fn record_feedback_sent(feedback_type: &str) {
    let labels = [("type", feedback_type.to_string())];
    counter!(names::FEEDBACK_SENT_TOTAL, &labels).increment(1);
}

/// Record a notification delivery attempt.
pub fn record_notification(kind: &str, delivered: bool) {
    let labels = [
        ("kind", kind.to_string()),
        ("outcome", if delivered { "delivered" } else { "failed" }.to_string()),
    ];
    counter!(names::NOTIFICATIONS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static CLOSE_HASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/close/[A-Za-z0-9_-]+").expect("static regex"));
static JOB_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/job/[A-Za-z0-9]{16}").expect("static regex"));
static NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").expect("static regex"));

/// Sanitize path for metrics labels (remove slugs, hashes and ids).
fn sanitize_path(path: &str) -> String {
    let path = CLOSE_HASH.replace_all(path, "/close/:hash");
    let path = JOB_SLUG.replace_all(&path, "/job/:slug");
    let path = NUMERIC_ID.replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
