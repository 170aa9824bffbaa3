//! Askama page templates.
//!
//! Every page extends `base.html`, which reads `user` for the navigation bar.

use askama::Template;
use chrono::{DateTime, Utc};

use pyjobs_models::{Applicant, Candidate, FeedbackType, Job, JobApplication, Page, Profile, User};

use crate::services::ApplyEligibility;

/// A job as shown in listings.
#[derive(Debug, Clone)]
pub struct JobCard {
    pub slug: String,
    pub title: String,
    pub company_name: String,
    pub workplace: String,
    pub remote: bool,
    pub featured: bool,
    pub posted_on: String,
}

impl JobCard {
    pub fn new(job: &Job, now: DateTime<Utc>) -> Self {
        Self {
            slug: job.unique_slug.clone(),
            title: job.title.clone(),
            company_name: job.company_name.clone(),
            workplace: job.workplace.clone(),
            remote: job.remote,
            featured: job.is_premium_active(now),
            posted_on: job.created_at.format("%d/%m/%Y").to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub user: Option<User>,
    pub status: u16,
    pub title: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub user: Option<User>,
    pub jobs: Vec<JobCard>,
}

#[derive(Template)]
#[template(path = "job_list.html")]
pub struct JobListPage {
    pub user: Option<User>,
    pub page: Page<JobCard>,
}

#[derive(Template)]
#[template(path = "job_detail.html")]
pub struct JobDetailPage {
    pub user: Option<User>,
    pub job: Job,
    pub featured: bool,
    /// Old posting; visitors should confirm it is still available.
    pub stale: bool,
    pub eligibility: ApplyEligibility,
    /// Staff or the posting account: links to applicants.
    pub is_company: bool,
    pub message: Option<String>,
}

/// Raw values of the posting form, echoed back on validation errors.
#[derive(Debug, Clone, Default)]
pub struct JobFormValues {
    pub title: String,
    pub workplace: String,
    pub company_name: String,
    pub company_email: String,
    pub application_link: String,
    pub description: String,
    pub requirements: String,
    pub salary_range: String,
    pub remote: bool,
    pub is_challenging: bool,
    pub challenge: String,
}

#[derive(Template)]
#[template(path = "job_form.html")]
pub struct JobFormPage {
    pub user: Option<User>,
    pub form: JobFormValues,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "job_created.html")]
pub struct JobCreatedPage {
    pub user: Option<User>,
    pub job: Job,
    pub job_url: String,
    pub close_url: String,
}

#[derive(Template)]
#[template(path = "challenge.html")]
pub struct ChallengePage {
    pub user: Option<User>,
    pub job: Job,
    pub challenge: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "job_closed.html")]
pub struct JobClosedPage {
    pub user: Option<User>,
    pub job_title: String,
    pub already_closed: bool,
}

#[derive(Template)]
#[template(path = "applicants.html")]
pub struct ApplicantsPage {
    pub user: Option<User>,
    pub job: Job,
    pub applicants: Vec<Applicant>,
}

#[derive(Template)]
#[template(path = "feedback.html")]
pub struct FeedbackPage {
    pub user: Option<User>,
    pub job: Job,
    pub application: JobApplication,
    pub applicant: Option<Applicant>,
    pub feedback_types: Vec<(i16, &'static str)>,
    pub sent_to: Option<String>,
    pub error: Option<String>,
}

impl FeedbackPage {
    pub fn feedback_types() -> Vec<(i16, &'static str)> {
        FeedbackType::ALL.iter().map(|t| (t.code(), t.label())).collect()
    }

    /// Label of the feedback already recorded, if any.
    pub fn recorded_type(&self) -> &'static str {
        self.application.feedback_type().map(|t| t.label()).unwrap_or("")
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub user: Option<User>,
    pub next: String,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterValues {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub user: Option<User>,
    pub form: RegisterValues,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfilePage {
    pub user: Option<User>,
    pub profile: Profile,
    pub errors: Vec<String>,
    pub saved: bool,
}

#[derive(Template)]
#[template(path = "resume_list.html")]
pub struct ResumeListPage {
    pub user: Option<User>,
    pub page: Page<Candidate>,
}

#[derive(Template)]
#[template(path = "resume_detail.html")]
pub struct ResumeDetailPage {
    pub user: Option<User>,
    pub candidate: Candidate,
}

#[derive(Template)]
#[template(path = "pricing.html")]
pub struct PricingPage {
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_page_escapes_message() {
        let page = ErrorPage {
            user: None,
            status: 404,
            title: "Not Found".to_string(),
            message: "<script>alert(1)</script>".to_string(),
        };
        let html = page.render().unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }
}
