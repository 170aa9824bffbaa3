//! Company feedback on a single application.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use pyjobs_models::{ApplicationId, User};

use crate::auth::CurrentUser;
use crate::error::PageResult;
use crate::handlers::render;
use crate::services::{ApplicationReview, LifecycleError};
use crate::state::AppState;
use crate::views::FeedbackPage;

fn feedback_page(
    user: User,
    review: ApplicationReview,
    sent_to: Option<String>,
    error: Option<String>,
) -> FeedbackPage {
    FeedbackPage {
        user: Some(user),
        job: review.job,
        application: review.application,
        applicant: review.applicant,
        feedback_types: FeedbackPage::feedback_types(),
        sent_to,
        error,
    }
}

/// Feedback form for one application.
pub async fn feedback_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> PageResult<Response> {
    let review = state.lifecycle.review(&user, ApplicationId(id)).await?;
    Ok(render(feedback_page(user, review, None, None))?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub company_feedback: String,
    #[serde(default)]
    pub feedback_type: String,
}

/// Send feedback to the applicant. Only once per application.
pub async fn send_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<FeedbackForm>,
) -> PageResult<Response> {
    let id = ApplicationId(id);

    let result = match form.feedback_type.trim().parse::<i16>() {
        Ok(code) => {
            state
                .lifecycle
                .submit_feedback(&user, id, &form.company_feedback, code)
                .await
        }
        Err(_) => Err(LifecycleError::Validation("Choose a feedback type".to_string())),
    };

    match result {
        Ok(review) => {
            let sent_to = review.applicant.as_ref().map(|a| a.email.clone());
            Ok(render(feedback_page(user, review, sent_to, None))?.into_response())
        }
        Err(err @ (LifecycleError::Validation(_) | LifecycleError::FeedbackAlreadySent)) => {
            let status = match err {
                LifecycleError::FeedbackAlreadySent => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            let review = state.lifecycle.review(&user, id).await?;
            let page = feedback_page(user, review, None, Some(err.to_string()));
            Ok((status, render(page)?).into_response())
        }
        Err(err) => Err(err.into()),
    }
}
