//! In-memory store.
//!
//! Mirrors the PostgreSQL store's constraints (unique usernames, slugs and
//! (job, user) applications; conditional updates) so the web layer behaves the
//! same against either. Used by tests and by local runs without `DATABASE_URL`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use pyjobs_models::{
    Applicant, ApiKey, ApplicationId, Candidate, Job, JobApplication, JobId, NewJob, NewUser, PageWindow,
    PremiumWindow, Profile, ProfileUpdate, User, UserId,
};

use crate::error::{DbError, DbResult};
use crate::store::{
    AccountRepository, ApiKeyRepository, ApplicationRepository, JobFilter, JobRepository, Store,
    APPLICATION_UNIQUE_CONSTRAINT,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    profiles: HashMap<UserId, Profile>,
    jobs: Vec<Job>,
    applications: Vec<JobApplication>,
    api_keys: Vec<ApiKey>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn application_mut(&mut self, id: ApplicationId) -> Option<&mut JobApplication> {
        self.applications.iter_mut().find(|a| a.id == id)
    }

    fn candidate(&self, profile: &Profile) -> Option<Candidate> {
        if !profile.resume_directory_opt_in {
            return None;
        }
        self.users
            .iter()
            .find(|u| u.id == profile.user_id)
            .map(|user| Candidate::from_parts(user, profile))
    }
}

fn page<T: Clone>(items: &[T], window: PageWindow) -> Vec<T> {
    items
        .iter()
        .skip(window.offset.max(0) as usize)
        .take(window.limit.max(0) as usize)
        .cloned()
        .collect()
}

fn newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn create_job(
        &self,
        owner: Option<UserId>,
        slug: &str,
        job: &NewJob,
        now: DateTime<Utc>,
    ) -> DbResult<Job> {
        let mut tables = self.tables.write().await;
        if tables.jobs.iter().any(|j| j.unique_slug == slug) {
            return Err(DbError::already_exists("jobs_unique_slug_key"));
        }
        let created = Job {
            id: JobId(tables.next_id()),
            unique_slug: slug.to_string(),
            owner_id: owner,
            title: job.title.clone(),
            workplace: job.workplace.clone(),
            company_name: job.company_name.clone(),
            company_email: job.company_email.clone(),
            application_link: job.application_link.clone(),
            description: job.description.clone(),
            requirements: job.requirements.clone(),
            salary_range: job.salary_range.clone(),
            remote: job.remote,
            premium: false,
            premium_at: None,
            public: false,
            is_open: true,
            is_challenging: job.is_challenging,
            challenge: job.challenge.clone(),
            created_at: now,
            closed_at: None,
        };
        tables.jobs.push(created.clone());
        Ok(created)
    }

    async fn find_job(&self, id: JobId) -> DbResult<Option<Job>> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn find_job_by_slug(&self, slug: &str) -> DbResult<Option<Job>> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.iter().find(|j| j.unique_slug == slug).cloned())
    }

    async fn count_jobs(&self, filter: JobFilter) -> DbResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.iter().filter(|j| filter.matches(j)).count() as i64)
    }

    async fn list_jobs(&self, filter: JobFilter, window: PageWindow) -> DbResult<Vec<Job>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables.jobs.iter().filter(|j| filter.matches(j)).cloned().collect();
        newest_first(&mut jobs);
        Ok(page(&jobs, window))
    }

    async fn list_feed_jobs(&self, premium: Option<PremiumWindow>, limit: i64) -> DbResult<Vec<Job>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .iter()
            .filter(|j| JobFilter::Listed.matches(j))
            .filter(|j| match premium {
                Some(window) => j.premium && j.premium_at.is_some_and(|at| window.contains(at)),
                None => true,
            })
            .cloned()
            .collect();
        newest_first(&mut jobs);
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn close_job(&self, id: JobId, now: DateTime<Utc>) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.job_mut(id) {
            Some(job) if job.is_open => {
                job.is_open = false;
                job.closed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_job_public(&self, id: JobId, public: bool) -> DbResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        Ok(tables.job_mut(id).map(|job| {
            job.public = public;
            job.clone()
        }))
    }

    async fn set_job_premium(
        &self,
        id: JobId,
        premium: bool,
        premium_at: Option<DateTime<Utc>>,
    ) -> DbResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        Ok(tables.job_mut(id).map(|job| {
            job.premium = premium;
            job.premium_at = premium_at;
            job.clone()
        }))
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryStore {
    async fn create_application(
        &self,
        job: JobId,
        user: UserId,
        challenge_link: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<JobApplication> {
        let mut tables = self.tables.write().await;
        if tables
            .applications
            .iter()
            .any(|a| a.job_id == job && a.user_id == user)
        {
            return Err(DbError::already_exists(APPLICATION_UNIQUE_CONSTRAINT));
        }
        let application = JobApplication {
            id: ApplicationId(tables.next_id()),
            job_id: job,
            user_id: user,
            created_at: now,
            challenge_response_link: challenge_link.map(str::to_string),
            challenge_submitted_at: challenge_link.map(|_| now),
            company_feedback: None,
            company_feedback_type: None,
            feedback_at: None,
        };
        tables.applications.push(application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: ApplicationId) -> DbResult<Option<JobApplication>> {
        let tables = self.tables.read().await;
        Ok(tables.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn find_application_for(&self, job: JobId, user: UserId) -> DbResult<Option<JobApplication>> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .find(|a| a.job_id == job && a.user_id == user)
            .cloned())
    }

    async fn set_challenge_response(&self, id: ApplicationId, link: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.application_mut(id) {
            Some(application) if application.challenge_response_link.is_none() => {
                application.challenge_response_link = Some(link.to_string());
                application.challenge_submitted_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_applications(&self, job: JobId) -> DbResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.applications.iter().filter(|a| a.job_id == job).count() as i64)
    }

    async fn list_applications(&self, job: JobId, window: PageWindow) -> DbResult<Vec<JobApplication>> {
        let tables = self.tables.read().await;
        let applications: Vec<JobApplication> = tables
            .applications
            .iter()
            .filter(|a| a.job_id == job)
            .cloned()
            .collect();
        Ok(page(&applications, window))
    }

    async fn list_applicants(&self, job: JobId) -> DbResult<Vec<Applicant>> {
        let tables = self.tables.read().await;
        let applicants = tables
            .applications
            .iter()
            .filter(|a| a.job_id == job)
            .filter_map(|a| {
                let user = tables.users.iter().find(|u| u.id == a.user_id)?;
                let profile = tables.profiles.get(&user.id).cloned().unwrap_or_default();
                Some(Applicant {
                    application_id: a.id,
                    user_id: user.id,
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    email: user.email.clone(),
                    github: profile.github,
                    linkedin: profile.linkedin,
                    portfolio: profile.portfolio,
                    cellphone: profile.cellphone,
                    applied_at: a.created_at,
                    challenge_response_link: a.challenge_response_link.clone(),
                    company_feedback: a.company_feedback.clone(),
                    company_feedback_type: a.company_feedback_type,
                })
            })
            .collect();
        Ok(applicants)
    }

    async fn record_feedback(
        &self,
        id: ApplicationId,
        text: &str,
        type_code: i16,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.application_mut(id) {
            Some(application) if application.company_feedback.is_none() => {
                application.company_feedback = Some(text.to_string());
                application.company_feedback_type = Some(type_code);
                application.feedback_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn create_user(&self, user: &NewUser, password_hash: &str, is_staff: bool) -> DbResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(DbError::already_exists("users_username_key"));
        }
        let created = User {
            id: UserId(tables.next_id()),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: password_hash.to_string(),
            is_staff,
            date_joined: Utc::now(),
        };
        tables.profiles.insert(
            created.id,
            Profile {
                user_id: created.id,
                ..Default::default()
            },
        );
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: UserId) -> DbResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_profile(&self, user: UserId) -> DbResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&user).cloned())
    }

    async fn update_profile(&self, user: UserId, update: &ProfileUpdate, now: DateTime<Utc>) -> DbResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&user)
            .ok_or_else(|| DbError::not_found(format!("profile for user {}", user)))?;
        profile.github = update.github.clone();
        profile.linkedin = update.linkedin.clone();
        profile.portfolio = update.portfolio.clone();
        profile.cellphone = update.cellphone.clone();
        profile.skills = update.skills.clone();
        profile.resume_directory_opt_in = update.resume_directory_opt_in;
        profile.updated_at = Some(now);
        Ok(profile.clone())
    }

    async fn set_resume_db_plan(&self, user: UserId, enabled: bool) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .profiles
            .get_mut(&user)
            .map(|profile| profile.resume_db_plan = enabled)
            .is_some())
    }

    async fn count_candidates(&self) -> DbResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|p| p.resume_directory_opt_in)
            .count() as i64)
    }

    async fn list_candidates(&self, window: PageWindow) -> DbResult<Vec<Candidate>> {
        let tables = self.tables.read().await;
        let mut candidates: Vec<Candidate> = tables
            .profiles
            .values()
            .filter_map(|p| tables.candidate(p))
            .collect();
        candidates.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(page(&candidates, window))
    }

    async fn find_candidate(&self, user: UserId) -> DbResult<Option<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&user).and_then(|p| tables.candidate(p)))
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryStore {
    async fn create_api_key(&self, label: &str, key_hash: &str) -> DbResult<ApiKey> {
        let mut tables = self.tables.write().await;
        if tables.api_keys.iter().any(|k| k.key_hash == key_hash) {
            return Err(DbError::already_exists("api_keys_key_hash_key"));
        }
        let key = ApiKey {
            id: tables.next_id(),
            label: label.to_string(),
            key_hash: key_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.api_keys.push(key.clone());
        Ok(key)
    }

    async fn api_key_is_active(&self, key_hash: &str) -> DbResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .api_keys
            .iter()
            .any(|k| k.key_hash == key_hash && k.is_active))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            password: "unused-password".to_string(),
        }
    }

    fn new_job(title: &str) -> NewJob {
        NewJob {
            title: title.to_string(),
            workplace: "Remote".to_string(),
            company_name: "Acme".to_string(),
            company_email: "jobs@acme.test".to_string(),
            description: "Do the work".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_jobs_start_pending_and_list_after_publish() {
        let store = InMemoryStore::new();
        let job = store
            .create_job(None, "slug0000000000001", &new_job("A"), Utc::now())
            .await
            .unwrap();
        assert!(!job.public);
        assert_eq!(store.count_jobs(JobFilter::Listed).await.unwrap(), 0);
        assert_eq!(store.count_jobs(JobFilter::Pending).await.unwrap(), 1);

        store.set_job_public(job.id, true).await.unwrap();
        assert_eq!(store.count_jobs(JobFilter::Listed).await.unwrap(), 1);

        let err = store
            .create_job(None, "slug0000000000001", &new_job("B"), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_premium_feed_limit_counts_only_active_jobs() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let premium_at = [now - Duration::days(2), now + Duration::days(1), now - Duration::days(45)];
        let mut ids = Vec::new();
        for (i, at) in premium_at.into_iter().enumerate() {
            // Newest first: the scheduled job sorts ahead of the active one.
            let created = now - Duration::hours(10 - i as i64);
            let job = store
                .create_job(None, &format!("prem{:012}", i), &new_job(&format!("premium {}", i)), created)
                .await
                .unwrap();
            store.set_job_public(job.id, true).await.unwrap();
            store.set_job_premium(job.id, true, Some(at)).await.unwrap();
            ids.push(job.id);
        }

        let feed = store.list_feed_jobs(Some(PremiumWindow::at(now)), 1).await.unwrap();
        assert_eq!(feed.iter().map(|j| j.id).collect::<Vec<_>>(), vec![ids[0]]);

        let all = store.list_feed_jobs(None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_and_windowed() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for i in 0..5 {
            let job = store
                .create_job(None, &format!("slug{:012}", i), &new_job(&format!("job {}", i)), now - Duration::days(i))
                .await
                .unwrap();
            store.set_job_public(job.id, true).await.unwrap();
        }

        let first = store
            .list_jobs(JobFilter::Listed, PageWindow { limit: 2, offset: 0 })
            .await
            .unwrap();
        assert_eq!(first.iter().map(|j| j.title.as_str()).collect::<Vec<_>>(), ["job 0", "job 1"]);

        let last = store
            .list_jobs(JobFilter::Listed, PageWindow { limit: 2, offset: 4 })
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].title, "job 4");
    }

    #[tokio::test]
    async fn test_application_uniqueness_and_conditional_updates() {
        let store = InMemoryStore::new();
        let user = store.create_user(&new_user("ana"), "hash", false).await.unwrap();
        let job = store
            .create_job(None, "slug0000000000002", &new_job("A"), Utc::now())
            .await
            .unwrap();

        let application = store
            .create_application(job.id, user.id, None, Utc::now())
            .await
            .unwrap();
        let err = store
            .create_application(job.id, user.id, Some("https://example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(ref c) if c == APPLICATION_UNIQUE_CONSTRAINT));

        assert!(store
            .set_challenge_response(application.id, "https://github.com/ana/fizzbuzz", Utc::now())
            .await
            .unwrap());
        assert!(!store
            .set_challenge_response(application.id, "https://github.com/ana/other", Utc::now())
            .await
            .unwrap());

        assert!(store.record_feedback(application.id, "Welcome!", 1, Utc::now()).await.unwrap());
        assert!(!store.record_feedback(application.id, "Again", 2, Utc::now()).await.unwrap());

        let stored = store.find_application(application.id).await.unwrap().unwrap();
        assert_eq!(stored.company_feedback.as_deref(), Some("Welcome!"));
        assert_eq!(stored.challenge_response_link.as_deref(), Some("https://github.com/ana/fizzbuzz"));
    }

    #[tokio::test]
    async fn test_candidates_require_opt_in() {
        let store = InMemoryStore::new();
        let shy = store.create_user(&new_user("shy"), "hash", false).await.unwrap();
        let open = store.create_user(&new_user("open"), "hash", false).await.unwrap();

        let update = ProfileUpdate {
            skills: Some("Django, Rust".to_string()),
            resume_directory_opt_in: true,
            ..Default::default()
        };
        store.update_profile(open.id, &update, Utc::now()).await.unwrap();

        assert_eq!(store.count_candidates().await.unwrap(), 1);
        assert!(store.find_candidate(shy.id).await.unwrap().is_none());
        let candidate = store.find_candidate(open.id).await.unwrap().unwrap();
        assert_eq!(candidate.skills.as_deref(), Some("Django, Rust"));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = InMemoryStore::new();
        store.create_user(&new_user("ana"), "hash", false).await.unwrap();
        assert!(store
            .create_user(&new_user("ana"), "hash", false)
            .await
            .unwrap_err()
            .is_unique_violation());
    }
}
