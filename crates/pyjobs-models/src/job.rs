//! Job postings.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// How long a premium activation keeps a job in the premium feed.
pub const PREMIUM_WINDOW_DAYS: i64 = 30;

/// Age after which a job page asks visitors to confirm the opening is still available.
pub const STALE_AFTER_DAYS: i64 = 60;

/// Length of a job's public slug.
pub const JOB_SLUG_LEN: usize = 16;

const SLUG_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Numeric identifier for a job, exposed through the REST API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct JobId(pub i64);

impl JobId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Job {
    pub id: JobId,
    /// Opaque public identifier used in URLs.
    pub unique_slug: String,
    /// Account that posted the job, when it was posted while logged in.
    pub owner_id: Option<crate::UserId>,
    pub title: String,
    pub workplace: String,
    pub company_name: String,
    pub company_email: String,
    pub application_link: Option<String>,
    pub description: String,
    pub requirements: String,
    pub salary_range: Option<String>,
    pub remote: bool,
    pub premium: bool,
    pub premium_at: Option<DateTime<Utc>>,
    /// Set by moderation; non-public jobs are hidden from listings, feeds and the API.
    pub public: bool,
    pub is_open: bool,
    pub is_challenging: bool,
    pub challenge: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Whether the job is inside its premium window at `now`.
    pub fn is_premium_active(&self, now: DateTime<Utc>) -> bool {
        if !self.premium {
            return false;
        }
        self.premium_at
            .is_some_and(|at| PremiumWindow::at(now).contains(at))
    }

    /// Whether the job is old enough to show the availability warning.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::days(STALE_AFTER_DAYS)
    }
}

/// The `premium_at` values that are active at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PremiumWindow {
    /// Exclusive.
    pub since: DateTime<Utc>,
    /// Inclusive.
    pub until: DateTime<Utc>,
}

impl PremiumWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            since: now - Duration::days(PREMIUM_WINDOW_DAYS),
            until: now,
        }
    }

    pub fn contains(&self, premium_at: DateTime<Utc>) -> bool {
        self.since < premium_at && premium_at <= self.until
    }
}

/// A validated job posting submitted through the posting form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_challenge"))]
pub struct NewJob {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 200, message = "workplace is required"))]
    pub workplace: String,
    #[validate(length(min = 1, max = 200, message = "company name is required"))]
    pub company_name: String,
    #[validate(email(message = "enter a valid e-mail address"))]
    pub company_email: String,
    #[validate(url(message = "enter a valid URL"))]
    pub application_link: Option<String>,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[validate(length(max = 100))]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub is_challenging: bool,
    pub challenge: Option<String>,
}

fn validate_challenge(job: &NewJob) -> Result<(), ValidationError> {
    let has_challenge = job
        .challenge
        .as_deref()
        .map(|c| !c.trim().is_empty())
        .unwrap_or(false);
    if job.is_challenging && !has_challenge {
        let mut err = ValidationError::new("challenge_required");
        err.message = Some("describe the challenge for a challenging job".into());
        return Err(err);
    }
    Ok(())
}

/// Generate a random job slug.
///
/// Draws from a v4 UUID (122 random bits) and renders base62 digits,
/// which is enough entropy to keep slugs unguessable.
pub fn generate_job_slug() -> String {
    let mut value = uuid::Uuid::new_v4().as_u128();
    let mut slug = String::with_capacity(JOB_SLUG_LEN);
    for _ in 0..JOB_SLUG_LEN {
        slug.push(SLUG_ALPHABET[(value % 62) as usize] as char);
        value /= 62;
    }
    slug
}

/// Validate a job slug format.
pub fn is_valid_job_slug(slug: &str) -> bool {
    slug.len() == JOB_SLUG_LEN && slug.chars().all(|c| c.is_ascii_alphanumeric())
}
