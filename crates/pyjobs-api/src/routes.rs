//! HTTP routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{accounts, admin, api, applications, feeds, jobs, resumes};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, form_rate_limit_middleware, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Close links are guessable only by brute force; keep that slow.
const CLOSE_LINK_RPS: u32 = 5;

/// Create the application router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let form_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));
    let api_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));
    let close_limiter = Arc::new(RateLimiterCache::new(CLOSE_LINK_RPS));

    let page_routes = Router::new()
        .route("/", get(jobs::index))
        .route("/jobs/", get(jobs::list_jobs))
        .route("/job/:slug/details/", get(jobs::applicant_details))
        .route("/job/:slug/app/", get(jobs::applicants_export))
        .route("/feed/", get(feeds::jobs_feed))
        .route("/feed/premium/", get(feeds::premium_feed))
        .route("/logout/", post(accounts::logout))
        .route("/resumes/", get(resumes::list_resumes))
        .route("/resumes/:user_id/", get(resumes::resume_detail))
        .route("/pricing/", get(resumes::pricing));

    // Pages whose POST writes something.
    let form_routes = Router::new()
        .route("/job/create/", get(jobs::create_job_form).post(jobs::create_job))
        .route("/job/:slug/", get(jobs::job_detail).post(jobs::apply))
        .route(
            "/job/:slug/challenge_submit/",
            get(jobs::challenge_form).post(jobs::challenge_submit),
        )
        .route(
            "/job/application/:id/",
            get(applications::feedback_form).post(applications::send_feedback),
        )
        .route("/register/", get(accounts::register_form).post(accounts::register))
        .route("/login/", get(accounts::login_form).post(accounts::login))
        .route("/profile/", get(accounts::profile).post(accounts::update_profile))
        .layer(middleware::from_fn_with_state(form_limiter, form_rate_limit_middleware));

    let close_routes = Router::new()
        .route("/job/:slug/close/:hash/", get(jobs::close_job))
        .layer(middleware::from_fn_with_state(close_limiter, rate_limit_middleware));

    let api_routes = Router::new()
        .route("/jobs/", get(api::list_jobs))
        .route("/jobs/:id/", get(api::get_job))
        .route("/job-applications/", get(api::list_applications))
        .layer(middleware::from_fn_with_state(api_limiter, rate_limit_middleware));

    let admin_routes = Router::new()
        .route("/admin/jobs/pending/", get(admin::list_pending_jobs))
        .route("/admin/jobs/:id/publish/", post(admin::publish_job))
        .route("/admin/jobs/:id/premium/", post(admin::set_premium))
        .route("/admin/users/:id/plan/", post(admin::set_user_plan))
        .route("/admin/api-keys/", post(admin::create_api_key));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(page_routes)
        .merge(form_routes)
        .merge(close_routes)
        .nest("/api", api_routes)
        .merge(admin_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
