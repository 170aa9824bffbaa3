//! Application lifecycle: who may apply, the challenge step, close links,
//! company-only access and feedback.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use pyjobs_db::{DbError, Store};
use pyjobs_models::{Applicant, ApplicationId, CloseHasher, FeedbackType, Job, JobApplication, User};

use crate::error::{ApiError, PageError};
use crate::metrics;
use crate::security::{validate_public_link, MAX_FEEDBACK_LENGTH};
use crate::services::notifier::{dispatch, Notification, Notifier};

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("You have already applied to this job")]
    AlreadyApplied,

    #[error("This job requires a challenge submission before applying")]
    ChallengeRequired,

    #[error("This job does not have a challenge")]
    NotChallenging,

    #[error("This job is closed")]
    JobClosed,

    #[error("{0}")]
    Validation(String),

    #[error("Feedback was already sent for this application")]
    FeedbackAlreadySent,

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(what) => ApiError::NotFound(what),
            LifecycleError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            LifecycleError::Forbidden(msg) => ApiError::Forbidden(msg),
            LifecycleError::Validation(msg) => ApiError::Validation(msg),
            LifecycleError::Store(e) => ApiError::Database(e),
            LifecycleError::ChallengeRequired | LifecycleError::NotChallenging => {
                ApiError::BadRequest(err.to_string())
            }
            LifecycleError::AlreadyApplied | LifecycleError::JobClosed | LifecycleError::FeedbackAlreadySent => {
                ApiError::Conflict(err.to_string())
            }
        }
    }
}

impl From<LifecycleError> for PageError {
    fn from(err: LifecycleError) -> Self {
        PageError(err.into())
    }
}

/// What the job page should offer a visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyEligibility {
    LoginRequired,
    AlreadyApplied,
    Closed,
    /// Open challenging job: the visitor goes through the challenge step.
    ChallengeRequired,
    Eligible,
}

/// Result of following a close link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
}

/// An application as the company sees it on the feedback page.
#[derive(Debug, Clone)]
pub struct ApplicationReview {
    pub job: Job,
    pub application: JobApplication,
    pub applicant: Option<Applicant>,
}

/// Rules around applying to, closing and reviewing jobs.
#[derive(Clone)]
pub struct ApplicationLifecycle {
    store: Arc<dyn Store>,
    hasher: CloseHasher,
    notifier: Arc<dyn Notifier>,
    site_url: String,
}

impl ApplicationLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: CloseHasher,
        notifier: Arc<dyn Notifier>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hasher,
            notifier,
            site_url: site_url.into(),
        }
    }

    /// Close hash for a job slug.
    pub fn close_hash(&self, slug: &str) -> String {
        self.hasher.hash(slug)
    }

    /// Absolute close link for a job.
    pub fn close_url(&self, job: &Job) -> String {
        format!(
            "{}/job/{}/close/{}/",
            self.site_url,
            job.unique_slug,
            self.close_hash(&job.unique_slug)
        )
    }

    pub fn job_url(&self, job: &Job) -> String {
        format!("{}/job/{}/", self.site_url, job.unique_slug)
    }

    /// Look a job up by slug.
    pub async fn job_by_slug(&self, slug: &str) -> LifecycleResult<Job> {
        self.store
            .find_job_by_slug(slug)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Job".to_string()))
    }

    /// Decide what the job page offers `user`.
    pub async fn eligibility(&self, user: Option<&User>, job: &Job) -> LifecycleResult<ApplyEligibility> {
        let Some(user) = user else {
            return Ok(ApplyEligibility::LoginRequired);
        };
        if self.store.find_application_for(job.id, user.id).await?.is_some() {
            return Ok(ApplyEligibility::AlreadyApplied);
        }
        if !job.is_open {
            return Ok(ApplyEligibility::Closed);
        }
        if job.is_challenging {
            return Ok(ApplyEligibility::ChallengeRequired);
        }
        Ok(ApplyEligibility::Eligible)
    }

    /// Authenticated, not applied yet, and the job is open.
    pub async fn can_apply(&self, user: Option<&User>, job: &Job) -> LifecycleResult<bool> {
        Ok(matches!(
            self.eligibility(user, job).await?,
            ApplyEligibility::Eligible | ApplyEligibility::ChallengeRequired
        ))
    }

    /// Apply `user` to `job`.
    pub async fn apply(
        &self,
        user: &User,
        job: &Job,
        challenge_link: Option<&str>,
    ) -> LifecycleResult<JobApplication> {
        if self.store.find_application_for(job.id, user.id).await?.is_some() {
            return Err(LifecycleError::AlreadyApplied);
        }
        if !job.is_open {
            return Err(LifecycleError::JobClosed);
        }
        let link = match challenge_link {
            Some(raw) => Some(validate_public_link(raw).into_result().map_err(LifecycleError::Validation)?),
            None if job.is_challenging => return Err(LifecycleError::ChallengeRequired),
            None => None,
        };

        let application = match self
            .store
            .create_application(job.id, user.id, link.as_deref(), Utc::now())
            .await
        {
            Ok(application) => application,
            // Lost a race with a concurrent apply for the same pair.
            Err(e) if e.is_unique_violation() => return Err(LifecycleError::AlreadyApplied),
            Err(e) => return Err(e.into()),
        };

        info!(job = %job.unique_slug, user_id = %user.id, "Application received");
        metrics::record_application_created(job.is_challenging);

        dispatch(
            Arc::clone(&self.notifier),
            Notification::ApplicationReceived {
                job_title: job.title.clone(),
                job_url: self.job_url(job),
                company_email: job.company_email.clone(),
                applicant_name: user.full_name(),
                applicant_email: user.email.clone(),
            },
        );

        Ok(application)
    }

    /// The challenge step: record a challenge response, applying if needed.
    pub async fn submit_challenge(&self, user: &User, job: &Job, link: &str) -> LifecycleResult<JobApplication> {
        if !job.is_challenging {
            return Err(LifecycleError::NotChallenging);
        }
        let link = validate_public_link(link)
            .into_result()
            .map_err(LifecycleError::Validation)?;

        let Some(existing) = self.store.find_application_for(job.id, user.id).await? else {
            return self.apply(user, job, Some(&link)).await;
        };
        if existing.has_challenge_response() {
            return Err(LifecycleError::AlreadyApplied);
        }
        if !self
            .store
            .set_challenge_response(existing.id, &link, Utc::now())
            .await?
        {
            return Err(LifecycleError::AlreadyApplied);
        }

        info!(job = %job.unique_slug, user_id = %user.id, "Challenge response recorded");
        self.store
            .find_application(existing.id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Application".to_string()))
    }

    /// Follow a close link.
    pub async fn close(&self, slug: &str, hash: &str) -> LifecycleResult<CloseOutcome> {
        let job = self.job_by_slug(slug).await?;

        if !self.hasher.verify(&job.unique_slug, hash) {
            warn!(job = %slug, "Rejected close link");
            metrics::record_close_rejected();
            return Err(LifecycleError::Unauthorized("Invalid close link".to_string()));
        }

        if self.store.close_job(job.id, Utc::now()).await? {
            info!(job = %slug, "Job closed");
            metrics::record_job_closed();
            Ok(CloseOutcome::Closed)
        } else {
            Ok(CloseOutcome::AlreadyClosed)
        }
    }

    /// Only staff and the account that posted the job see its applicants.
    pub fn can_view_applicant_details(&self, viewer: Option<&User>, job: &Job) -> bool {
        match viewer {
            Some(user) => user.is_staff || job.owner_id == Some(user.id),
            None => false,
        }
    }

    pub fn authorize_company(&self, viewer: &User, job: &Job) -> LifecycleResult<()> {
        if self.can_view_applicant_details(Some(viewer), job) {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(
                "Only the company that posted this job can see its applicants".to_string(),
            ))
        }
    }

    /// Applicants of `job`, for its company.
    pub async fn applicants(&self, viewer: &User, job: &Job) -> LifecycleResult<Vec<Applicant>> {
        self.authorize_company(viewer, job)?;
        Ok(self.store.list_applicants(job.id).await?)
    }

    /// Load an application for its company's feedback page.
    pub async fn review(&self, viewer: &User, id: ApplicationId) -> LifecycleResult<ApplicationReview> {
        let application = self
            .store
            .find_application(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Application".to_string()))?;
        let job = self
            .store
            .find_job(application.job_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound("Job".to_string()))?;
        self.authorize_company(viewer, &job)?;

        let applicant = self
            .store
            .list_applicants(job.id)
            .await?
            .into_iter()
            .find(|a| a.application_id == application.id);

        Ok(ApplicationReview {
            job,
            application,
            applicant,
        })
    }

    /// Send feedback on an application. Allowed once per application.
    pub async fn submit_feedback(
        &self,
        viewer: &User,
        id: ApplicationId,
        text: &str,
        type_code: i16,
    ) -> LifecycleResult<ApplicationReview> {
        let review = self.review(viewer, id).await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(LifecycleError::Validation("Feedback cannot be empty".to_string()));
        }
        if text.len() > MAX_FEEDBACK_LENGTH {
            return Err(LifecycleError::Validation(format!(
                "Feedback exceeds maximum length of {} characters",
                MAX_FEEDBACK_LENGTH
            )));
        }
        let kind = FeedbackType::try_from(type_code).map_err(|e| LifecycleError::Validation(e.to_string()))?;

        if review.application.has_feedback()
            || !self
                .store
                .record_feedback(review.application.id, text, kind.code(), Utc::now())
                .await?
        {
            return Err(LifecycleError::FeedbackAlreadySent);
        }

        info!(
            application_id = %review.application.id,
            job = %review.job.unique_slug,
            feedback_type = %kind,
            "Feedback sent"
        );
        metrics::record_feedback_sent(kind.label());

        if let Some(applicant) = &review.applicant {
            dispatch(
                Arc::clone(&self.notifier),
                Notification::FeedbackSent {
                    job_title: review.job.title.clone(),
                    company_name: review.job.company_name.clone(),
                    applicant_name: format!("{} {}", applicant.first_name, applicant.last_name)
                        .trim()
                        .to_string(),
                    applicant_email: applicant.email.clone(),
                    feedback: text.to_string(),
                    feedback_type: kind.label().to_string(),
                },
            );
        }

        self.review(viewer, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyjobs_db::{AccountRepository, ApplicationRepository, InMemoryStore, JobRepository};
    use pyjobs_models::{generate_job_slug, NewJob, NewUser, UserId};

    use crate::services::notifier::LogNotifier;

    struct Fixture {
        store: Arc<InMemoryStore>,
        lifecycle: ApplicationLifecycle,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let lifecycle = ApplicationLifecycle::new(
            store.clone(),
            CloseHasher::new("test-secret").unwrap(),
            Arc::new(LogNotifier),
            "http://testserver",
        );
        Fixture { store, lifecycle }
    }

    async fn user(store: &InMemoryStore, username: &str, is_staff: bool) -> User {
        store
            .create_user(
                &NewUser {
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                    first_name: "First".to_string(),
                    last_name: "Last".to_string(),
                    password: "unused-password".to_string(),
                },
                "hash",
                is_staff,
            )
            .await
            .unwrap()
    }

    async fn job(store: &InMemoryStore, owner: Option<UserId>, challenging: bool) -> Job {
        let draft = NewJob {
            title: "Python developer".to_string(),
            workplace: "Remote".to_string(),
            company_name: "Acme".to_string(),
            company_email: "jobs@acme.test".to_string(),
            description: "Build the board".to_string(),
            is_challenging: challenging,
            challenge: challenging.then(|| "Write FizzBuzz".to_string()),
            ..Default::default()
        };
        let job = store
            .create_job(owner, &generate_job_slug(), &draft, Utc::now())
            .await
            .unwrap();
        store.set_job_public(job.id, true).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_apply_twice_yields_one_application() {
        let f = fixture();
        let ana = user(&f.store, "ana", false).await;
        let job = job(&f.store, None, false).await;

        assert!(f.lifecycle.can_apply(Some(&ana), &job).await.unwrap());
        f.lifecycle.apply(&ana, &job, None).await.unwrap();

        let err = f.lifecycle.apply(&ana, &job, None).await.unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyApplied));
        assert_eq!(f.store.count_applications(job.id).await.unwrap(), 1);
        assert!(!f.lifecycle.can_apply(Some(&ana), &job).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_applies_yield_one_application() {
        let f = fixture();
        let ana = user(&f.store, "ana", false).await;
        let job = job(&f.store, None, false).await;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let lifecycle = f.lifecycle.clone();
                let (ana, job) = (ana.clone(), job.clone());
                tokio::spawn(async move { lifecycle.apply(&ana, &job, None).await })
            })
            .collect();

        let (mut applied, mut duplicates) = (0, 0);
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => applied += 1,
                Err(LifecycleError::AlreadyApplied) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(f.store.count_applications(job.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_eligibility_states() {
        let f = fixture();
        let ana = user(&f.store, "ana", false).await;
        let plain = job(&f.store, None, false).await;
        let challenging = job(&f.store, None, true).await;

        assert_eq!(
            f.lifecycle.eligibility(None, &plain).await.unwrap(),
            ApplyEligibility::LoginRequired
        );
        assert_eq!(
            f.lifecycle.eligibility(Some(&ana), &plain).await.unwrap(),
            ApplyEligibility::Eligible
        );
        assert_eq!(
            f.lifecycle.eligibility(Some(&ana), &challenging).await.unwrap(),
            ApplyEligibility::ChallengeRequired
        );

        let hash = f.lifecycle.close_hash(&plain.unique_slug);
        f.lifecycle.close(&plain.unique_slug, &hash).await.unwrap();
        let closed = f.lifecycle.job_by_slug(&plain.unique_slug).await.unwrap();
        assert_eq!(
            f.lifecycle.eligibility(Some(&ana), &closed).await.unwrap(),
            ApplyEligibility::Closed
        );
        assert!(matches!(
            f.lifecycle.apply(&ana, &closed, None).await.unwrap_err(),
            LifecycleError::JobClosed
        ));
    }

    #[tokio::test]
    async fn test_challenging_job_requires_link() {
        let f = fixture();
        let ana = user(&f.store, "ana", false).await;
        let job = job(&f.store, None, true).await;

        assert!(matches!(
            f.lifecycle.apply(&ana, &job, None).await.unwrap_err(),
            LifecycleError::ChallengeRequired
        ));
        assert!(matches!(
            f.lifecycle.submit_challenge(&ana, &job, "not a url").await.unwrap_err(),
            LifecycleError::Validation(_)
        ));

        let application = f
            .lifecycle
            .submit_challenge(&ana, &job, "https://github.com/ana/fizzbuzz")
            .await
            .unwrap();
        assert_eq!(
            application.challenge_response_link.as_deref(),
            Some("https://github.com/ana/fizzbuzz")
        );
        assert!(matches!(
            f.lifecycle
                .submit_challenge(&ana, &job, "https://github.com/ana/other")
                .await
                .unwrap_err(),
            LifecycleError::AlreadyApplied
        ));
    }

    #[tokio::test]
    async fn test_challenge_recorded_on_existing_application() {
        let f = fixture();
        let ana = user(&f.store, "ana", false).await;
        let job = job(&f.store, None, true).await;
        let existing = f
            .store
            .create_application(job.id, ana.id, None, Utc::now())
            .await
            .unwrap();

        let updated = f
            .lifecycle
            .submit_challenge(&ana, &job, "https://gitlab.com/ana/challenge")
            .await
            .unwrap();
        assert_eq!(updated.id, existing.id);
        assert!(updated.challenge_submitted_at.is_some());
    }

    #[tokio::test]
    async fn test_challenge_on_plain_job_is_rejected() {
        let f = fixture();
        let ana = user(&f.store, "ana", false).await;
        let job = job(&f.store, None, false).await;
        assert!(matches!(
            f.lifecycle
                .submit_challenge(&ana, &job, "https://github.com/ana/x")
                .await
                .unwrap_err(),
            LifecycleError::NotChallenging
        ));
    }

    #[tokio::test]
    async fn test_close_link_rules() {
        let f = fixture();
        let job = job(&f.store, None, false).await;
        let hash = f.lifecycle.close_hash(&job.unique_slug);

        assert!(matches!(
            f.lifecycle.close("missing-slug", &hash).await.unwrap_err(),
            LifecycleError::NotFound(_)
        ));

        let mut tampered = hash.clone();
        let last = if tampered.ends_with('A') { "B" } else { "A" };
        tampered.replace_range(tampered.len() - 1.., last);
        assert!(matches!(
            f.lifecycle.close(&job.unique_slug, &tampered).await.unwrap_err(),
            LifecycleError::Unauthorized(_)
        ));
        assert!(f.lifecycle.job_by_slug(&job.unique_slug).await.unwrap().is_open);

        assert_eq!(
            f.lifecycle.close(&job.unique_slug, &hash).await.unwrap(),
            CloseOutcome::Closed
        );
        let closed = f.lifecycle.job_by_slug(&job.unique_slug).await.unwrap();
        assert!(!closed.is_open);
        let closed_at = closed.closed_at;

        assert_eq!(
            f.lifecycle.close(&job.unique_slug, &hash).await.unwrap(),
            CloseOutcome::AlreadyClosed
        );
        assert_eq!(
            f.lifecycle.job_by_slug(&job.unique_slug).await.unwrap().closed_at,
            closed_at
        );
    }

    #[tokio::test]
    async fn test_applicant_access_is_company_only() {
        let f = fixture();
        let owner = user(&f.store, "acme", false).await;
        let staff = user(&f.store, "admin", true).await;
        let stranger = user(&f.store, "someone", false).await;
        let job = job(&f.store, Some(owner.id), false).await;

        assert!(!f.lifecycle.can_view_applicant_details(None, &job));
        assert!(!f.lifecycle.can_view_applicant_details(Some(&stranger), &job));
        assert!(f.lifecycle.can_view_applicant_details(Some(&owner), &job));
        assert!(f.lifecycle.can_view_applicant_details(Some(&staff), &job));

        assert!(matches!(
            f.lifecycle.applicants(&stranger, &job).await.unwrap_err(),
            LifecycleError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn test_feedback_is_sent_once() {
        let f = fixture();
        let owner = user(&f.store, "acme", false).await;
        let ana = user(&f.store, "ana", false).await;
        let job = job(&f.store, Some(owner.id), false).await;
        let application = f.lifecycle.apply(&ana, &job, None).await.unwrap();

        assert!(matches!(
            f.lifecycle
                .submit_feedback(&ana, application.id, "Hired myself", 1)
                .await
                .unwrap_err(),
            LifecycleError::Forbidden(_)
        ));
        assert!(matches!(
            f.lifecycle
                .submit_feedback(&owner, application.id, "   ", 1)
                .await
                .unwrap_err(),
            LifecycleError::Validation(_)
        ));
        assert!(matches!(
            f.lifecycle
                .submit_feedback(&owner, application.id, "Thanks", 7)
                .await
                .unwrap_err(),
            LifecycleError::Validation(_)
        ));

        let review = f
            .lifecycle
            .submit_feedback(&owner, application.id, "Welcome aboard", 1)
            .await
            .unwrap();
        assert_eq!(review.application.feedback_type(), Some(FeedbackType::Approved));

        assert!(matches!(
            f.lifecycle
                .submit_feedback(&owner, application.id, "Actually no", 2)
                .await
                .unwrap_err(),
            LifecycleError::FeedbackAlreadySent
        ));
    }
}
