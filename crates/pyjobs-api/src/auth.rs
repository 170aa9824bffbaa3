//! Session authentication.
//!
//! Logged-in users carry an HS256 session token in an HttpOnly cookie.
//! Passwords are stored as Argon2 PHC strings.

use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pyjobs_models::{User, UserId};

use crate::error::{ApiError, ApiResult, PageError};
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "pyjobs_session";

const SESSION_AUDIENCE: &str = "pyjobs-session";

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    /// User ID
    sub: i64,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs and checks session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration, secure_cookie: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            secure_cookie,
        }
    }

    /// Issue a session token for `user`.
    pub fn issue(&self, user: UserId) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.0,
            aud: SESSION_AUDIENCE.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign session: {}", e)))
    }

    /// User the token was issued to, if it is valid and unexpired.
    pub fn verify(&self, token: &str) -> Option<UserId> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SESSION_AUDIENCE]);
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(UserId(data.claims.sub)),
            Err(e) => {
                debug!(error = %e, "Ignoring invalid session token");
                None
            }
        }
    }

    /// Cookie carrying a freshly issued session. The token itself expires,
    /// so the cookie is left as a browser-session cookie.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .build()
    }

    /// Cookie that clears the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, "")).path("/").build()
    }
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Resolve the session cookie to a user.
async fn session_user(parts: &Parts, state: &AppState) -> ApiResult<Option<User>> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(user_id) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.verify(cookie.value()))
    else {
        return Ok(None);
    };
    Ok(state.store.find_user(user_id).await?)
}

fn requested_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

/// Logged-in user; anonymous visitors are sent to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_user(parts, state).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::login_required(requested_path(parts)).into()),
        }
    }
}

/// The logged-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state).await?))
    }
}

/// Logged-in staff user, for the JSON moderation endpoints.
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = session_user(parts, state)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Login required"))?;
        if !user.is_staff {
            return Err(ApiError::forbidden("Staff access required"));
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_round_trip() {
        let keys = SessionKeys::new("secret", Duration::from_secs(3600), false);
        let token = keys.issue(UserId(42)).unwrap();
        assert_eq!(keys.verify(&token), Some(UserId(42)));

        let other = SessionKeys::new("another-secret", Duration::from_secs(3600), false);
        assert_eq!(other.verify(&token), None);
        assert_eq!(keys.verify("garbage"), None);
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
