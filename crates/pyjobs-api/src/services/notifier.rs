//! Outbound notifications.
//!
//! Notifications are dispatched fire-and-forget on the runtime: a slow or
//! failing receiver never delays or fails the request that triggered it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::metrics;

/// Something worth telling a company or an applicant about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// Sent to the posting company.
    ApplicationReceived {
        job_title: String,
        job_url: String,
        company_email: String,
        applicant_name: String,
        applicant_email: String,
    },
    /// Sent to the applicant.
    FeedbackSent {
        job_title: String,
        company_name: String,
        applicant_name: String,
        applicant_email: String,
        feedback: String,
        feedback_type: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ApplicationReceived { .. } => "application_received",
            Notification::FeedbackSent { .. } => "feedback_sent",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::ApplicationReceived { company_email, .. } => company_email,
            Notification::FeedbackSent { applicant_email, .. } => applicant_email,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Receiver responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            kind = notification.kind(),
            recipient = notification.recipient(),
            "Notification (no webhook configured)"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to a webhook that handles mail delivery.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Deliver `notification` in the background, logging failures.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        match notifier.notify(&notification).await {
            Ok(()) => metrics::record_notification(notification.kind(), true),
            Err(e) => {
                metrics::record_notification(notification.kind(), false);
                warn!(
                    kind = notification.kind(),
                    recipient = notification.recipient(),
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn received() -> Notification {
        Notification::ApplicationReceived {
            job_title: "Python developer".to_string(),
            job_url: "http://localhost:8000/job/abc/".to_string(),
            company_email: "jobs@acme.test".to_string(),
            applicant_name: "Ana Souza".to_string(),
            applicant_email: "ana@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_webhook_posts_tagged_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/notify"))
            .and(body_partial_json(serde_json::json!({
                "event": "application_received",
                "company_email": "jobs@acme.test"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hooks/notify", server.uri())).unwrap();
        notifier.notify(&received()).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri()).unwrap();
        let err = notifier.notify(&received()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(500)));
    }
}
