//! User accounts and their one-to-one profiles.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Numeric identifier for a user account.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Staff accounts moderate postings and can review every job's applicants.
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Profile attached to every user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Profile {
    pub user_id: UserId,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub cellphone: Option<String>,
    pub skills: Option<String>,
    /// Listed in the resume directory.
    pub resume_directory_opt_in: bool,
    /// Paid plan that unlocks browsing the resume directory.
    pub resume_db_plan: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registration input.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 150, message = "username must have 3 to 150 characters"))]
    pub username: String,
    #[validate(email(message = "enter a valid e-mail address"))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "last name is required"))]
    pub last_name: String,
    #[validate(length(min = 8, message = "password must have at least 8 characters"))]
    pub password: String,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(url(message = "enter a valid URL"))]
    pub github: Option<String>,
    #[validate(url(message = "enter a valid URL"))]
    pub linkedin: Option<String>,
    #[validate(url(message = "enter a valid URL"))]
    pub portfolio: Option<String>,
    #[validate(length(max = 30))]
    pub cellphone: Option<String>,
    #[validate(length(max = 2000))]
    pub skills: Option<String>,
    #[serde(default)]
    pub resume_directory_opt_in: bool,
}

/// A resume-directory entry: the public parts of an opted-in user and profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub cellphone: Option<String>,
    pub skills: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn from_parts(user: &User, profile: &Profile) -> Self {
        Self {
            user_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            github: profile.github.clone(),
            linkedin: profile.linkedin.clone(),
            portfolio: profile.portfolio.clone(),
            cellphone: profile.cellphone.clone(),
            skills: profile.skills.clone(),
            updated_at: profile.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: UserId(7),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_staff: false,
            date_joined: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(user.full_name(), "Ana Souza");
    }

    #[test]
    fn test_registration_rules() {
        let mut input = NewUser {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(input.validate().is_ok());

        input.password = "short".to_string();
        assert!(input.validate().is_err());
    }
}
