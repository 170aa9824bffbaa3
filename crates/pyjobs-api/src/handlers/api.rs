//! Read-only REST resources.
//!
//! Lists share one envelope:
//! `{"objects": [...], "meta": {"page", "limit", "total_pages", "total_count", "next", "previous"}}`.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use pyjobs_models::{digest_api_key, Job, JobApplication, JobId, Page};

use crate::error::{ApiError, ApiResult};
use crate::handlers::PageQuery;
use crate::services::listing;
use crate::state::AppState;

/// Pagination metadata of a list response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListMeta {
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub next: bool,
    pub previous: bool,
}

/// A page of objects.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListResponse<T> {
    pub objects: Vec<T>,
    pub meta: ListMeta,
}

impl<T> From<Page<T>> for ListResponse<T> {
    fn from(page: Page<T>) -> Self {
        let meta = ListMeta {
            page: page.number,
            limit: page.per_page,
            total_pages: page.num_pages,
            total_count: page.count,
            next: page.has_next(),
            previous: page.has_previous(),
        };
        Self {
            objects: page.items,
            meta,
        }
    }
}

/// Public fields of a job.
#[derive(Debug, Serialize, JsonSchema)]
pub struct JobResource {
    pub id: JobId,
    pub title: String,
    pub workplace: String,
    pub company_name: String,
    pub description: String,
    pub requirements: String,
    pub created_at: DateTime<Utc>,
    pub remote: bool,
}

impl From<Job> for JobResource {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            workplace: job.workplace,
            company_name: job.company_name,
            description: job.description,
            requirements: job.requirements,
            created_at: job.created_at,
            remote: job.remote,
        }
    }
}

/// `GET /api/jobs/?page=N`
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListResponse<JobResource>>> {
    let page = listing::api_jobs(state.store.as_ref(), query.page.as_deref()).await?;
    Ok(Json(page.map(JobResource::from).into()))
}

/// `GET /api/jobs/{id}/`
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<JobResource>> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid job id: {:?}", id)))?;
    let job = state
        .store
        .find_job(JobId(id))
        .await?
        .filter(|job| job.public)
        .ok_or_else(|| ApiError::not_found("Job"))?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
pub struct ApplicationsQuery {
    pub api_key: Option<String>,
    pub id: Option<String>,
    pub page: Option<String>,
}

/// `GET /api/job-applications/?api_key=K&id=J&page=N`
///
/// The key is checked before anything else so unauthenticated callers learn
/// nothing about jobs.
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationsQuery>,
) -> ApiResult<Json<ListResponse<JobApplication>>> {
    let key = query
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::unauthorized("API key required"))?;
    if !state.store.api_key_is_active(&digest_api_key(key)).await? {
        warn!("Rejected REST request with an unknown API key");
        return Err(ApiError::unauthorized("Invalid API key"));
    }

    let raw_id = query
        .id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Query parameter 'id' is required"))?;
    let job_id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid job id: {:?}", raw_id)))?;
    let job = state
        .store
        .find_job(JobId(job_id))
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("Job {} does not exist", job_id)))?;

    let page = listing::api_applications(state.store.as_ref(), job.id, query.page.as_deref()).await?;
    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_meta() {
        let page = pyjobs_models::Paginator::new(45, 20).page(2, vec![1, 2, 3]);
        let body = serde_json::to_value(ListResponse::from(page)).unwrap();
        assert_eq!(
            body["meta"],
            serde_json::json!({
                "page": 2,
                "limit": 20,
                "total_pages": 3,
                "total_count": 45,
                "next": true,
                "previous": true
            })
        );
        assert_eq!(body["objects"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_job_resource_schema_lists_public_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(JobResource)).unwrap();
        let mut fields: Vec<&str> = schema["properties"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        fields.sort();
        assert_eq!(
            fields,
            vec!["company_name", "created_at", "description", "id", "remote", "requirements", "title", "workplace"]
        );
    }
}
