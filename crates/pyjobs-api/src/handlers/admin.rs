//! Staff moderation endpoints (JSON).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use pyjobs_db::JobFilter;
use pyjobs_models::pagination::API_PAGE_SIZE;
use pyjobs_models::{digest_api_key, generate_api_key, Job, JobId, UserId};

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::api::ListResponse;
use crate::handlers::PageQuery;
use crate::services::{paginate, PageMode};
use crate::state::AppState;

/// `GET /admin/jobs/pending/` - postings waiting for review, newest first.
pub async fn list_pending_jobs(
    State(state): State<AppState>,
    StaffUser(_staff): StaffUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListResponse<Job>>> {
    let store = state.store.as_ref();
    let count = store.count_jobs(JobFilter::Pending).await?;
    let page = paginate(count, API_PAGE_SIZE, query.page.as_deref(), PageMode::Strict, |window| {
        store.list_jobs(JobFilter::Pending, window)
    })
    .await?;
    Ok(Json(page.into()))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub public: bool,
}

/// `POST /admin/jobs/{id}/publish/`
pub async fn publish_job(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<Json<Job>> {
    let job = state
        .store
        .set_job_public(JobId(id), request.public)
        .await?
        .ok_or_else(|| ApiError::not_found("Job"))?;

    info!(staff = %staff.username, job = %job.unique_slug, public = request.public, "Job moderated");
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct PremiumRequest {
    pub premium: bool,
}

/// `POST /admin/jobs/{id}/premium/` - activating starts a new premium window.
pub async fn set_premium(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    Json(request): Json<PremiumRequest>,
) -> ApiResult<Json<Job>> {
    let premium_at = request.premium.then(Utc::now);
    let job = state
        .store
        .set_job_premium(JobId(id), request.premium, premium_at)
        .await?
        .ok_or_else(|| ApiError::not_found("Job"))?;

    info!(staff = %staff.username, job = %job.unique_slug, premium = request.premium, "Job premium changed");
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub resume_db_plan: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub user_id: UserId,
    pub resume_db_plan: bool,
}

/// `POST /admin/users/{id}/plan/`
pub async fn set_user_plan(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Json<PlanResponse>> {
    let user_id = UserId(id);
    if !state.store.set_resume_db_plan(user_id, request.resume_db_plan).await? {
        return Err(ApiError::not_found("User"));
    }

    info!(staff = %staff.username, user_id = %user_id, enabled = request.resume_db_plan, "Resume plan changed");
    Ok(Json(PlanResponse {
        user_id,
        resume_db_plan: request.resume_db_plan,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    pub label: String,
}

/// The raw key is only ever returned here.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: i64,
    pub label: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /admin/api-keys/`
pub async fn create_api_key(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(request): Json<ApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<ApiKeyResponse>)> {
    let label = request.label.trim();
    if label.is_empty() {
        return Err(ApiError::validation("label is required"));
    }

    let raw = generate_api_key();
    let key = state.store.create_api_key(label, &digest_api_key(&raw)).await?;

    info!(staff = %staff.username, key_id = key.id, label = %key.label, "API key issued");
    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            id: key.id,
            label: key.label,
            key: raw,
            created_at: key.created_at,
        }),
    ))
}
