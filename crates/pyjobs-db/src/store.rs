//! Repository traits shared by the PostgreSQL and in-memory stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pyjobs_models::{
    Applicant, ApiKey, ApplicationId, Candidate, Job, JobApplication, JobId, NewJob, NewUser, PageWindow, PremiumWindow,
    Profile, ProfileUpdate, User, UserId,
};

use crate::error::DbResult;

/// Constraint name reported when a (job, user) pair applies twice.
pub const APPLICATION_UNIQUE_CONSTRAINT: &str = "job_applications_job_user_key";

/// Which jobs a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFilter {
    /// Public and open: the job board.
    Listed,
    /// Every public job, open or closed.
    Public,
    /// Waiting for moderation.
    Pending,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            JobFilter::Listed => job.public && job.is_open,
            JobFilter::Public => job.public,
            JobFilter::Pending => !job.public,
        }
    }
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a job posting, pending moderation.
    async fn create_job(
        &self,
        owner: Option<UserId>,
        slug: &str,
        job: &NewJob,
        now: DateTime<Utc>,
    ) -> DbResult<Job>;

    async fn find_job(&self, id: JobId) -> DbResult<Option<Job>>;

    async fn find_job_by_slug(&self, slug: &str) -> DbResult<Option<Job>>;

    async fn count_jobs(&self, filter: JobFilter) -> DbResult<i64>;

    /// Newest first.
    async fn list_jobs(&self, filter: JobFilter, window: PageWindow) -> DbResult<Vec<Job>>;

    /// Newest listed jobs, optionally only premium ones whose `premium_at` falls in `premium`.
    async fn list_feed_jobs(&self, premium: Option<PremiumWindow>, limit: i64) -> DbResult<Vec<Job>>;

    /// Mark a job closed. Returns false if it was already closed.
    async fn close_job(&self, id: JobId, now: DateTime<Utc>) -> DbResult<bool>;

    async fn set_job_public(&self, id: JobId, public: bool) -> DbResult<Option<Job>>;

    async fn set_job_premium(
        &self,
        id: JobId,
        premium: bool,
        premium_at: Option<DateTime<Utc>>,
    ) -> DbResult<Option<Job>>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert an application. A second application for the same (job, user)
    /// fails with `DbError::AlreadyExists(APPLICATION_UNIQUE_CONSTRAINT)`.
    async fn create_application(
        &self,
        job: JobId,
        user: UserId,
        challenge_link: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<JobApplication>;

    async fn find_application(&self, id: ApplicationId) -> DbResult<Option<JobApplication>>;

    async fn find_application_for(&self, job: JobId, user: UserId) -> DbResult<Option<JobApplication>>;

    /// Record a challenge response unless one exists. Returns false if nothing changed.
    async fn set_challenge_response(&self, id: ApplicationId, link: &str, now: DateTime<Utc>) -> DbResult<bool>;

    async fn count_applications(&self, job: JobId) -> DbResult<i64>;

    /// Oldest first.
    async fn list_applications(&self, job: JobId, window: PageWindow) -> DbResult<Vec<JobApplication>>;

    /// Every application of a job with the applicant's account and profile, oldest first.
    async fn list_applicants(&self, job: JobId) -> DbResult<Vec<Applicant>>;

    /// Store company feedback unless some was already sent. Returns false if nothing changed.
    async fn record_feedback(
        &self,
        id: ApplicationId,
        text: &str,
        type_code: i16,
        now: DateTime<Utc>,
    ) -> DbResult<bool>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a user and their empty profile.
    async fn create_user(&self, user: &NewUser, password_hash: &str, is_staff: bool) -> DbResult<User>;

    async fn find_user(&self, id: UserId) -> DbResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>>;

    async fn find_profile(&self, user: UserId) -> DbResult<Option<Profile>>;

    async fn update_profile(&self, user: UserId, update: &ProfileUpdate, now: DateTime<Utc>) -> DbResult<Profile>;

    /// Returns false if the user has no profile.
    async fn set_resume_db_plan(&self, user: UserId, enabled: bool) -> DbResult<bool>;

    /// Profiles that opted into the resume directory.
    async fn count_candidates(&self) -> DbResult<i64>;

    /// Most recently updated first.
    async fn list_candidates(&self, window: PageWindow) -> DbResult<Vec<Candidate>>;

    /// A single candidate, only if they opted in.
    async fn find_candidate(&self, user: UserId) -> DbResult<Option<Candidate>>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn create_api_key(&self, label: &str, key_hash: &str) -> DbResult<ApiKey>;

    async fn api_key_is_active(&self, key_hash: &str) -> DbResult<bool>;
}

/// Everything the web layer needs from storage.
#[async_trait]
pub trait Store: JobRepository + ApplicationRepository + AccountRepository + ApiKeyRepository {
    /// Cheap round-trip used by the readiness check.
    async fn ping(&self) -> DbResult<()>;
}
