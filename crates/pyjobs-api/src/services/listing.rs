//! Paginated listings.
//!
//! HTML pages resolve the page token leniently and always render; the REST
//! API resolves it strictly and answers 400 for anything unusable.

use std::future::Future;

use pyjobs_db::{DbResult, JobFilter, Store};
use pyjobs_models::pagination::{API_PAGE_SIZE, JOBS_PER_PAGE, RESUMES_PER_PAGE};
use pyjobs_models::{Candidate, Job, JobApplication, JobId, Page, PageWindow, Paginator};

use crate::error::ApiResult;

/// How a page token is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    Lenient,
    Strict,
}

/// Resolve `token` against `count` items and fetch the matching window.
pub async fn paginate<T, F, Fut>(
    count: i64,
    per_page: i64,
    token: Option<&str>,
    mode: PageMode,
    fetch: F,
) -> ApiResult<Page<T>>
where
    F: FnOnce(PageWindow) -> Fut,
    Fut: Future<Output = DbResult<Vec<T>>>,
{
    let pager = Paginator::new(count, per_page);
    let number = match mode {
        PageMode::Lenient => pager.resolve_lenient(token),
        PageMode::Strict => pager.resolve_strict(token)?,
    };
    let items = fetch(pager.window(number)).await?;
    Ok(pager.page(number, items))
}

/// The public job board.
pub async fn job_board(store: &dyn Store, token: Option<&str>) -> ApiResult<Page<Job>> {
    let count = store.count_jobs(JobFilter::Listed).await?;
    paginate(count, JOBS_PER_PAGE, token, PageMode::Lenient, |window| {
        store.list_jobs(JobFilter::Listed, window)
    })
    .await
}

/// Newest listed jobs for the home page.
pub async fn newest_jobs(store: &dyn Store) -> ApiResult<Vec<Job>> {
    let window = PageWindow {
        limit: JOBS_PER_PAGE,
        offset: 0,
    };
    Ok(store.list_jobs(JobFilter::Listed, window).await?)
}

/// Public jobs for the REST API.
pub async fn api_jobs(store: &dyn Store, token: Option<&str>) -> ApiResult<Page<Job>> {
    let count = store.count_jobs(JobFilter::Public).await?;
    paginate(count, API_PAGE_SIZE, token, PageMode::Strict, |window| {
        store.list_jobs(JobFilter::Public, window)
    })
    .await
}

/// Applications of one job for the REST API.
pub async fn api_applications(store: &dyn Store, job: JobId, token: Option<&str>) -> ApiResult<Page<JobApplication>> {
    let count = store.count_applications(job).await?;
    paginate(count, API_PAGE_SIZE, token, PageMode::Strict, |window| {
        store.list_applications(job, window)
    })
    .await
}

/// The resume directory.
pub async fn candidates(store: &dyn Store, token: Option<&str>) -> ApiResult<Page<Candidate>> {
    let count = store.count_candidates().await?;
    paginate(count, RESUMES_PER_PAGE, token, PageMode::Lenient, |window| {
        store.list_candidates(window)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use chrono::{Duration, Utc};
    use pyjobs_db::{InMemoryStore, JobRepository};
    use pyjobs_models::{generate_job_slug, NewJob};

    async fn seed(store: &InMemoryStore, listed: usize) {
        let base = Utc::now() - Duration::days(1);
        for i in 0..listed {
            let draft = NewJob {
                title: format!("Job {}", i),
                workplace: "Remote".to_string(),
                company_name: "Acme".to_string(),
                company_email: "jobs@acme.test".to_string(),
                description: "Work".to_string(),
                ..Default::default()
            };
            let job = store
                .create_job(None, &generate_job_slug(), &draft, base + Duration::minutes(i as i64))
                .await
                .unwrap();
            store.set_job_public(job.id, true).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_job_board_is_lenient() {
        let store = InMemoryStore::new();
        seed(&store, 25).await;

        let first = job_board(&store, Some("abc")).await.unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].title, "Job 24");

        let last = job_board(&store, Some("999")).await.unwrap();
        assert_eq!(last.number, 3);
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_next());
    }

    #[tokio::test]
    async fn test_api_jobs_is_strict() {
        let store = InMemoryStore::new();
        seed(&store, 25).await;

        let page = api_jobs(&store, Some("2")).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.num_pages, 2);

        for token in ["3", "0", "abc"] {
            let err = api_jobs(&store, Some(token)).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)), "token {token}");
        }
    }

    #[tokio::test]
    async fn test_empty_listing_has_one_page() {
        let store = InMemoryStore::new();
        let page = job_board(&store, None).await.unwrap();
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert!(api_jobs(&store, Some("1")).await.is_ok());
    }
}
