//! Shared helpers for the HTTP tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use tower::ServiceExt;

use pyjobs_api::services::NotifyError;
use pyjobs_api::{create_router, ApiConfig, AppState, Notification, Notifier};
use pyjobs_db::{AccountRepository, InMemoryStore, JobRepository};
use pyjobs_models::{generate_job_slug, Job, NewJob, NewUser, User};

/// Keeps every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::with_notifier(config, store.clone(), notifier.clone()).unwrap();
        let router = create_router(state.clone(), None);
        Self {
            router,
            state,
            store,
            notifier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)], cookie: Option<&str>) -> TestResponse {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Create an account directly in the store.
    pub async fn user(&self, username: &str, is_staff: bool) -> User {
        self.user_named(username, "Ada", "Lovelace", is_staff).await
    }

    pub async fn user_named(&self, username: &str, first: &str, last: &str, is_staff: bool) -> User {
        self.store
            .create_user(
                &NewUser {
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    password: "not-used-here".to_string(),
                },
                "not-a-phc-string",
                is_staff,
            )
            .await
            .unwrap()
    }

    /// `Cookie` header value carrying a session for `user`.
    pub fn session(&self, user: &User) -> String {
        let token = self.state.sessions.issue(user.id).unwrap();
        format!("pyjobs_session={}", token)
    }

    /// A published, open job.
    pub async fn job(&self, owner: Option<&User>, title: &str) -> Job {
        self.job_with(owner, new_job(title), Utc::now(), true).await
    }

    pub async fn job_with(&self, owner: Option<&User>, draft: NewJob, created_at: DateTime<Utc>, public: bool) -> Job {
        let job = self
            .store
            .create_job(owner.map(|u| u.id), &generate_job_slug(), &draft, created_at)
            .await
            .unwrap();
        if public {
            self.store.set_job_public(job.id, true).await.unwrap().unwrap()
        } else {
            job
        }
    }

    /// Wait for background notifications to be delivered.
    pub async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }
}

pub fn new_job(title: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        workplace: "Remote".to_string(),
        company_name: "Acme".to_string(),
        company_email: "jobs@acme.example".to_string(),
        application_link: None,
        description: "Build things".to_string(),
        requirements: "Python".to_string(),
        salary_range: None,
        remote: true,
        is_challenging: false,
        challenge: None,
    }
}

pub fn challenging_job(title: &str) -> NewJob {
    NewJob {
        is_challenging: true,
        challenge: Some("Write a FizzBuzz and share the repository".to_string()),
        ..new_job(title)
    }
}
