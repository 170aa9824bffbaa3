//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use pyjobs_models::{
    Applicant, ApiKey, ApplicationId, Candidate, Job, JobApplication, JobId, NewJob, NewUser, PageWindow,
    PremiumWindow, Profile, ProfileUpdate, User, UserId,
};

use crate::error::{DbError, DbResult};
use crate::store::{AccountRepository, ApiKeyRepository, ApplicationRepository, JobFilter, JobRepository, Store};

macro_rules! job_select {
    () => {
        "SELECT id, unique_slug, owner_id, title, workplace, company_name, company_email, application_link, \
         description, requirements, salary_range, remote, premium, premium_at, public, is_open, is_challenging, \
         challenge, created_at, closed_at FROM jobs"
    };
}

macro_rules! application_select {
    () => {
        "SELECT id, job_id, user_id, created_at, challenge_response_link, challenge_submitted_at, \
         company_feedback, company_feedback_type, feedback_at FROM job_applications"
    };
}

macro_rules! user_select {
    () => {
        "SELECT id, username, email, first_name, last_name, password_hash, is_staff, date_joined FROM users"
    };
}

macro_rules! profile_columns {
    () => {
        "user_id, github, linkedin, portfolio, cellphone, skills, resume_directory_opt_in, resume_db_plan, updated_at"
    };
}

macro_rules! candidate_select {
    () => {
        "SELECT u.id AS user_id, u.first_name, u.last_name, u.email, p.github, p.linkedin, p.portfolio, \
         p.cellphone, p.skills, p.updated_at \
         FROM profiles p JOIN users u ON u.id = p.user_id \
         WHERE p.resume_directory_opt_in"
    };
}

fn filter_clause(filter: JobFilter) -> &'static str {
    match filter {
        JobFilter::Listed => "public AND is_open",
        JobFilter::Public => "public",
        JobFilter::Pending => "NOT public",
    }
}

/// Connect a pool to `database_url`.
pub async fn connect(database_url: &str, max_connections: u32) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the bundled migrations.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migrations complete");
    Ok(())
}

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobRepository for PgStore {
    async fn create_job(
        &self,
        owner: Option<UserId>,
        slug: &str,
        job: &NewJob,
        now: DateTime<Utc>,
    ) -> DbResult<Job> {
        let created = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (unique_slug, owner_id, title, workplace, company_name, company_email,
                              application_link, description, requirements, salary_range, remote,
                              is_challenging, challenge, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, unique_slug, owner_id, title, workplace, company_name, company_email, application_link,
                      description, requirements, salary_range, remote, premium, premium_at, public, is_open,
                      is_challenging, challenge, created_at, closed_at
            "#,
        )
        .bind(slug)
        .bind(owner)
        .bind(&job.title)
        .bind(&job.workplace)
        .bind(&job.company_name)
        .bind(&job.company_email)
        .bind(&job.application_link)
        .bind(&job.description)
        .bind(&job.requirements)
        .bind(&job.salary_range)
        .bind(job.remote)
        .bind(job.is_challenging)
        .bind(&job.challenge)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_job(&self, id: JobId) -> DbResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(concat!(job_select!(), " WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn find_job_by_slug(&self, slug: &str) -> DbResult<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(concat!(job_select!(), " WHERE unique_slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn count_jobs(&self, filter: JobFilter) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM jobs WHERE {}", filter_clause(filter));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list_jobs(&self, filter: JobFilter, window: PageWindow) -> DbResult<Vec<Job>> {
        let sql = format!(
            "{} WHERE {} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            job_select!(),
            filter_clause(filter)
        );
        let jobs = sqlx::query_as::<_, Job>(&sql)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    async fn list_feed_jobs(&self, premium: Option<PremiumWindow>, limit: i64) -> DbResult<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(concat!(
            job_select!(),
            " WHERE public AND is_open",
            " AND ($1::timestamptz IS NULL OR (premium AND premium_at > $1 AND premium_at <= $2))",
            " ORDER BY created_at DESC, id DESC LIMIT $3"
        ))
        .bind(premium.map(|w| w.since))
        .bind(premium.map(|w| w.until))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn close_job(&self, id: JobId, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query("UPDATE jobs SET is_open = FALSE, closed_at = $2 WHERE id = $1 AND is_open")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_job_public(&self, id: JobId, public: bool) -> DbResult<Option<Job>> {
        let result = sqlx::query("UPDATE jobs SET public = $2 WHERE id = $1")
            .bind(id)
            .bind(public)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_job(id).await
    }

    async fn set_job_premium(
        &self,
        id: JobId,
        premium: bool,
        premium_at: Option<DateTime<Utc>>,
    ) -> DbResult<Option<Job>> {
        let result = sqlx::query("UPDATE jobs SET premium = $2, premium_at = $3 WHERE id = $1")
            .bind(id)
            .bind(premium)
            .bind(premium_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_job(id).await
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn create_application(
        &self,
        job: JobId,
        user: UserId,
        challenge_link: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<JobApplication> {
        let application = sqlx::query_as::<_, JobApplication>(
            r#"
            INSERT INTO job_applications (job_id, user_id, created_at, challenge_response_link, challenge_submitted_at)
            VALUES ($1, $2, $3, $4, CASE WHEN $4::text IS NULL THEN NULL ELSE $3 END)
            RETURNING id, job_id, user_id, created_at, challenge_response_link, challenge_submitted_at,
                      company_feedback, company_feedback_type, feedback_at
            "#,
        )
        .bind(job)
        .bind(user)
        .bind(now)
        .bind(challenge_link)
        .fetch_one(&self.pool)
        .await?;
        Ok(application)
    }

    async fn find_application(&self, id: ApplicationId) -> DbResult<Option<JobApplication>> {
        let application = sqlx::query_as::<_, JobApplication>(concat!(application_select!(), " WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(application)
    }

    async fn find_application_for(&self, job: JobId, user: UserId) -> DbResult<Option<JobApplication>> {
        let application = sqlx::query_as::<_, JobApplication>(concat!(
            application_select!(),
            " WHERE job_id = $1 AND user_id = $2"
        ))
        .bind(job)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn set_challenge_response(&self, id: ApplicationId, link: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE job_applications SET challenge_response_link = $2, challenge_submitted_at = $3 \
             WHERE id = $1 AND challenge_response_link IS NULL",
        )
        .bind(id)
        .bind(link)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_applications(&self, job: JobId) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_applications WHERE job_id = $1")
            .bind(job)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_applications(&self, job: JobId, window: PageWindow) -> DbResult<Vec<JobApplication>> {
        let applications = sqlx::query_as::<_, JobApplication>(concat!(
            application_select!(),
            " WHERE job_id = $1 ORDER BY created_at, id LIMIT $2 OFFSET $3"
        ))
        .bind(job)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    async fn list_applicants(&self, job: JobId) -> DbResult<Vec<Applicant>> {
        let applicants = sqlx::query_as::<_, Applicant>(
            r#"
            SELECT a.id AS application_id, u.id AS user_id, u.first_name, u.last_name, u.email,
                   p.github, p.linkedin, p.portfolio, p.cellphone, a.created_at AS applied_at,
                   a.challenge_response_link, a.company_feedback, a.company_feedback_type
            FROM job_applications a
            JOIN users u ON u.id = a.user_id
            LEFT JOIN profiles p ON p.user_id = u.id
            WHERE a.job_id = $1
            ORDER BY a.created_at, a.id
            "#,
        )
        .bind(job)
        .fetch_all(&self.pool)
        .await?;
        Ok(applicants)
    }

    async fn record_feedback(
        &self,
        id: ApplicationId,
        text: &str,
        type_code: i16,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE job_applications SET company_feedback = $2, company_feedback_type = $3, feedback_at = $4 \
             WHERE id = $1 AND company_feedback IS NULL",
        )
        .bind(id)
        .bind(text)
        .bind(type_code)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create_user(&self, user: &NewUser, password_hash: &str, is_staff: bool) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, first_name, last_name, password_hash, is_staff, date_joined
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(password_hash)
        .bind(is_staff)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_user(&self, id: UserId) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(user_select!(), " WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(user_select!(), " WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_profile(&self, user: UserId) -> DbResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(concat!(
            "SELECT ",
            profile_columns!(),
            " FROM profiles WHERE user_id = $1"
        ))
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn update_profile(&self, user: UserId, update: &ProfileUpdate, now: DateTime<Utc>) -> DbResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(concat!(
            "UPDATE profiles SET github = $2, linkedin = $3, portfolio = $4, cellphone = $5, skills = $6, \
             resume_directory_opt_in = $7, updated_at = $8 WHERE user_id = $1 RETURNING ",
            profile_columns!()
        ))
        .bind(user)
        .bind(&update.github)
        .bind(&update.linkedin)
        .bind(&update.portfolio)
        .bind(&update.cellphone)
        .bind(&update.skills)
        .bind(update.resume_directory_opt_in)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        profile.ok_or_else(|| DbError::not_found(format!("profile for user {}", user)))
    }

    async fn set_resume_db_plan(&self, user: UserId, enabled: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE profiles SET resume_db_plan = $2 WHERE user_id = $1")
            .bind(user)
            .bind(enabled)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_candidates(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE resume_directory_opt_in")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_candidates(&self, window: PageWindow) -> DbResult<Vec<Candidate>> {
        let candidates = sqlx::query_as::<_, Candidate>(concat!(
            candidate_select!(),
            " ORDER BY p.updated_at DESC NULLS LAST, u.id LIMIT $1 OFFSET $2"
        ))
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    async fn find_candidate(&self, user: UserId) -> DbResult<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(concat!(candidate_select!(), " AND u.id = $1"))
            .bind(user)
            .fetch_optional(&self.pool)
            .await?;
        Ok(candidate)
    }
}

#[async_trait]
impl ApiKeyRepository for PgStore {
    async fn create_api_key(&self, label: &str, key_hash: &str) -> DbResult<ApiKey> {
        let key = sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (label, key_hash) VALUES ($1, $2) \
             RETURNING id, label, key_hash, is_active, created_at",
        )
        .bind(label)
        .bind(key_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(key)
    }

    async fn api_key_is_active(&self, key_hash: &str) -> DbResult<bool> {
        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM api_keys WHERE key_hash = $1")
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(active.unwrap_or(false))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
