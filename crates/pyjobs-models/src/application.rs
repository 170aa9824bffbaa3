//! Job applications and company feedback.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{JobId, ModelError, UserId};

/// Numeric identifier for an application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's application to a job. At most one exists per (job, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub challenge_response_link: Option<String>,
    pub challenge_submitted_at: Option<DateTime<Utc>>,
    pub company_feedback: Option<String>,
    /// Raw [`FeedbackType`] code.
    pub company_feedback_type: Option<i16>,
    pub feedback_at: Option<DateTime<Utc>>,
}

impl JobApplication {
    pub fn has_challenge_response(&self) -> bool {
        self.challenge_response_link.is_some()
    }

    pub fn has_feedback(&self) -> bool {
        self.company_feedback.is_some()
    }

    pub fn feedback_type(&self) -> Option<FeedbackType> {
        self.company_feedback_type
            .and_then(|code| FeedbackType::try_from(code).ok())
    }
}

/// Outcome a company reports back to an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Approved,
    Rejected,
    OnHold,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 3] = [FeedbackType::Approved, FeedbackType::Rejected, FeedbackType::OnHold];

    pub fn code(&self) -> i16 {
        match self {
            FeedbackType::Approved => 1,
            FeedbackType::Rejected => 2,
            FeedbackType::OnHold => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedbackType::Approved => "Approved",
            FeedbackType::Rejected => "Rejected",
            FeedbackType::OnHold => "On hold",
        }
    }
}

impl TryFrom<i16> for FeedbackType {
    type Error = ModelError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(FeedbackType::Approved),
            2 => Ok(FeedbackType::Rejected),
            3 => Ok(FeedbackType::OnHold),
            other => Err(ModelError::InvalidFeedbackType(other)),
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An application joined with the applicant's account and profile, as shown to the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Applicant {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub cellphone: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub challenge_response_link: Option<String>,
    pub company_feedback: Option<String>,
    pub company_feedback_type: Option<i16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_codes() {
        for kind in FeedbackType::ALL {
            assert_eq!(FeedbackType::try_from(kind.code()).unwrap(), kind);
        }
        assert!(matches!(
            FeedbackType::try_from(9),
            Err(ModelError::InvalidFeedbackType(9))
        ));
    }
}
