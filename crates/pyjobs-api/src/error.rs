//! API error types.
//!
//! `ApiError` renders as a JSON `{detail}` body for the REST and admin routes.
//! `PageError` wraps it for HTML routes: same status codes, rendered as an
//! error page, with missing logins turned into a redirect to the login form.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use pyjobs_db::DbError;

use crate::views::ErrorPage;

pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for HTML handlers.
pub type PageResult<T> = Result<T, PageError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The route needs a session; `next` is where to return after logging in.
    #[error("Login required")]
    LoginRequired { next: String },

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn login_required(next: impl Into<String>) -> Self {
        Self::LoginRequired { next: next.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) | ApiError::LoginRequired { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Template(_)
        )
    }

    /// Message safe to show to the client.
    pub fn public_detail(&self) -> String {
        // Don't expose internal error details in production
        if self.is_internal() {
            error!(error = %self, "Request failed");
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                return "An internal error occurred".to_string();
            }
        }
        self.to_string()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.public_detail(),
        };

        (status, Json(body)).into_response()
    }
}

/// Strict page tokens that do not resolve are client errors.
impl From<pyjobs_models::PageError> for ApiError {
    fn from(err: pyjobs_models::PageError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Error returned by HTML handlers.
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let ApiError::LoginRequired { next } = &self.0 {
            let target = format!("/login/?next={}", urlencoding::encode(next));
            return Redirect::to(&target).into_response();
        }

        let status = self.0.status_code();
        let page = ErrorPage {
            user: None,
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.0.public_detail(),
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to render error page");
                (status, page.message).into_response()
            }
        }
    }
}

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<DbError> for PageError {
    fn from(err: DbError) -> Self {
        Self(ApiError::Database(err))
    }
}

impl From<askama::Error> for PageError {
    fn from(err: askama::Error) -> Self {
        Self(ApiError::Template(err))
    }
}
