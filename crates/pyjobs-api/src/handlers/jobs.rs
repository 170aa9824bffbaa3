//! Job board pages: listing, posting, detail, apply, challenge, close and
//! the company's applicant views.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use pyjobs_db::DbError;
use pyjobs_models::{generate_job_slug, Job, NewJob, User};

use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{ApiError, PageError, PageResult};
use crate::handlers::{form_errors, render, PageQuery};
use crate::metrics;
use crate::security::non_blank;
use crate::services::{listing, applicants_csv, ApplyEligibility, CloseOutcome, LifecycleError};
use crate::state::AppState;
use crate::views::{
    ApplicantsPage, ChallengePage, IndexPage, JobCard, JobClosedPage, JobCreatedPage, JobDetailPage, JobFormPage,
    JobFormValues, JobListPage,
};

/// Slug collisions are retried this many times before giving up.
const SLUG_ATTEMPTS: usize = 3;

/// Home page with the newest jobs.
pub async fn index(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> PageResult<Response> {
    let now = Utc::now();
    let jobs = listing::newest_jobs(state.store.as_ref()).await?;
    let page = IndexPage {
        user,
        jobs: jobs.iter().map(|job| JobCard::new(job, now)).collect(),
    };
    Ok(render(page)?.into_response())
}

/// Paginated job board. Any page token renders a page.
pub async fn list_jobs(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> PageResult<Response> {
    let now = Utc::now();
    let page = listing::job_board(state.store.as_ref(), query.page.as_deref()).await?;
    let page = JobListPage {
        user,
        page: page.map(|job| JobCard::new(&job, now)),
    };
    Ok(render(page)?.into_response())
}

/// Posting form as submitted.
#[derive(Debug, Default, Deserialize)]
pub struct JobForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub workplace: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_email: String,
    pub application_link: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    pub salary_range: Option<String>,
    pub remote: Option<String>,
    pub is_challenging: Option<String>,
    pub challenge: Option<String>,
}

impl JobForm {
    fn values(&self) -> JobFormValues {
        JobFormValues {
            title: self.title.clone(),
            workplace: self.workplace.clone(),
            company_name: self.company_name.clone(),
            company_email: self.company_email.clone(),
            application_link: self.application_link.clone().unwrap_or_default(),
            description: self.description.clone(),
            requirements: self.requirements.clone(),
            salary_range: self.salary_range.clone().unwrap_or_default(),
            remote: self.remote.is_some(),
            is_challenging: self.is_challenging.is_some(),
            challenge: self.challenge.clone().unwrap_or_default(),
        }
    }

    fn into_new_job(self) -> NewJob {
        let is_challenging = self.is_challenging.is_some();
        NewJob {
            title: self.title.trim().to_string(),
            workplace: self.workplace.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            company_email: self.company_email.trim().to_string(),
            application_link: non_blank(self.application_link),
            description: self.description.trim().to_string(),
            requirements: self.requirements.trim().to_string(),
            salary_range: non_blank(self.salary_range),
            remote: self.remote.is_some(),
            is_challenging,
            challenge: if is_challenging { non_blank(self.challenge) } else { None },
        }
    }
}

/// Empty posting form.
pub async fn create_job_form(MaybeUser(user): MaybeUser) -> PageResult<Response> {
    let page = JobFormPage {
        user,
        form: JobFormValues::default(),
        errors: Vec::new(),
    };
    Ok(render(page)?.into_response())
}

/// Submit a posting. It waits for moderation before being listed.
pub async fn create_job(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<JobForm>,
) -> PageResult<Response> {
    let values = form.values();
    let draft = form.into_new_job();

    if let Err(errors) = draft.validate() {
        let page = JobFormPage {
            user,
            form: values,
            errors: form_errors(&errors),
        };
        return Ok((StatusCode::BAD_REQUEST, render(page)?).into_response());
    }

    let owner = user.as_ref().map(|u| u.id);
    let job = insert_job(&state, owner, &draft).await?;

    info!(job = %job.unique_slug, company = %job.company_name, "Job posted, waiting for review");
    metrics::record_job_posted();

    let page = JobCreatedPage {
        user,
        job_url: state.lifecycle.job_url(&job),
        close_url: state.lifecycle.close_url(&job),
        job,
    };
    Ok(render(page)?.into_response())
}

async fn insert_job(state: &AppState, owner: Option<pyjobs_models::UserId>, draft: &NewJob) -> PageResult<Job> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match state
            .store
            .create_job(owner, &generate_job_slug(), draft, Utc::now())
            .await
        {
            Ok(job) => return Ok(job),
            Err(DbError::AlreadyExists(what)) if attempts < SLUG_ATTEMPTS => {
                warn!(constraint = %what, "Job slug collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Load a job the visitor may see: public jobs for everyone, pending ones
/// only for their company.
async fn visible_job(state: &AppState, user: Option<&User>, slug: &str) -> PageResult<Job> {
    let job = state.lifecycle.job_by_slug(slug).await?;
    if job.public || state.lifecycle.can_view_applicant_details(user, &job) {
        Ok(job)
    } else {
        Err(ApiError::not_found("Job").into())
    }
}

async fn render_detail(
    state: &AppState,
    user: Option<User>,
    job: Job,
    message: Option<String>,
) -> PageResult<Response> {
    let now = Utc::now();
    let eligibility = state.lifecycle.eligibility(user.as_ref(), &job).await?;
    let page = JobDetailPage {
        is_company: state.lifecycle.can_view_applicant_details(user.as_ref(), &job),
        featured: job.is_premium_active(now),
        stale: job.is_stale(now),
        eligibility,
        message,
        user,
        job,
    };
    Ok(render(page)?.into_response())
}

/// Job detail with the visitor's apply state.
pub async fn job_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
) -> PageResult<Response> {
    let job = visible_job(&state, user.as_ref(), &slug).await?;
    render_detail(&state, user, job, None).await
}

fn challenge_url(job: &Job) -> String {
    format!("/job/{}/challenge_submit/", job.unique_slug)
}

/// Apply to a job from its detail page.
pub async fn apply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> PageResult<Response> {
    let job = visible_job(&state, Some(&user), &slug).await?;

    let message = match state.lifecycle.apply(&user, &job, None).await {
        Ok(_) => "Your application was sent!".to_string(),
        Err(LifecycleError::ChallengeRequired) => {
            return Ok(Redirect::to(&challenge_url(&job)).into_response());
        }
        Err(err @ LifecycleError::AlreadyApplied) => err.to_string(),
        Err(err) => return Err(err.into()),
    };
    render_detail(&state, Some(user), job, Some(message)).await
}

/// Challenge step of a challenging job.
pub async fn challenge_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> PageResult<Response> {
    let job = visible_job(&state, Some(&user), &slug).await?;
    let Some(challenge) = job.challenge.clone().filter(|_| job.is_challenging) else {
        return Ok(Redirect::to(&format!("/job/{}/", job.unique_slug)).into_response());
    };
    if state.lifecycle.eligibility(Some(&user), &job).await? == ApplyEligibility::AlreadyApplied {
        let existing = state.store.find_application_for(job.id, user.id).await?;
        if existing.is_some_and(|a| a.has_challenge_response()) {
            return render_detail(&state, Some(user), job, Some(LifecycleError::AlreadyApplied.to_string())).await;
        }
    }

    let page = ChallengePage {
        user: Some(user),
        job,
        challenge,
        error: None,
    };
    Ok(render(page)?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct ChallengeForm {
    #[serde(default)]
    pub challenge_response_link: String,
}

/// Record a challenge response, applying if needed.
pub async fn challenge_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Form(form): Form<ChallengeForm>,
) -> PageResult<Response> {
    let job = visible_job(&state, Some(&user), &slug).await?;

    match state
        .lifecycle
        .submit_challenge(&user, &job, &form.challenge_response_link)
        .await
    {
        Ok(_) => {
            let message = "Challenge received, your application was sent!".to_string();
            render_detail(&state, Some(user), job, Some(message)).await
        }
        Err(LifecycleError::NotChallenging) => {
            Ok(Redirect::to(&format!("/job/{}/", job.unique_slug)).into_response())
        }
        Err(err @ LifecycleError::AlreadyApplied) => render_detail(&state, Some(user), job, Some(err.to_string())).await,
        Err(LifecycleError::Validation(msg)) => {
            let page = ChallengePage {
                challenge: job.challenge.clone().unwrap_or_default(),
                user: Some(user),
                job,
                error: Some(msg),
            };
            Ok((StatusCode::BAD_REQUEST, render(page)?).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// Close link sent to the company when the job was posted.
pub async fn close_job(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((slug, hash)): Path<(String, String)>,
) -> PageResult<Response> {
    let outcome = state.lifecycle.close(&slug, &hash).await?;
    let job = state.lifecycle.job_by_slug(&slug).await?;
    let page = JobClosedPage {
        user,
        job_title: job.title,
        already_closed: outcome == CloseOutcome::AlreadyClosed,
    };
    Ok(render(page)?.into_response())
}

/// Applicants of a job, for its company only.
pub async fn applicant_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> PageResult<Response> {
    let job = state.lifecycle.job_by_slug(&slug).await?;
    let applicants = state.lifecycle.applicants(&user, &job).await?;
    let page = ApplicantsPage {
        user: Some(user),
        job,
        applicants,
    };
    Ok(render(page)?.into_response())
}

/// Applicants of a job as a CSV download, for its company only.
pub async fn applicants_export(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, PageError> {
    let job = state.lifecycle.job_by_slug(&slug).await?;
    let applicants = state.lifecycle.applicants(&user, &job).await?;
    let body = applicants_csv(&applicants)?;

    let disposition = format!("attachment; filename=\"applicants-{}.csv\"", job.unique_slug);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
