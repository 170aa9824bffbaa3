//! Resume directory, for accounts with the paid plan.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};

use pyjobs_models::{User, UserId};

use crate::auth::MaybeUser;
use crate::error::{ApiError, PageResult};
use crate::handlers::{render, PageQuery};
use crate::services::listing;
use crate::state::AppState;
use crate::views::{PricingPage, ResumeDetailPage, ResumeListPage};

/// Outcome of the plan check.
enum Access {
    Granted(User),
    Denied(Redirect),
}

/// Anonymous visitors go home; accounts without the plan go to pricing.
async fn check_plan(state: &AppState, user: Option<User>) -> PageResult<Access> {
    let Some(user) = user else {
        return Ok(Access::Denied(Redirect::to("/")));
    };
    let has_plan = state
        .store
        .find_profile(user.id)
        .await?
        .is_some_and(|profile| profile.resume_db_plan);
    if has_plan {
        Ok(Access::Granted(user))
    } else {
        Ok(Access::Denied(Redirect::to("/pricing/")))
    }
}

pub async fn list_resumes(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> PageResult<Response> {
    let user = match check_plan(&state, user).await? {
        Access::Granted(user) => user,
        Access::Denied(redirect) => return Ok(redirect.into_response()),
    };

    let page = listing::candidates(state.store.as_ref(), query.page.as_deref()).await?;
    Ok(render(ResumeListPage { user: Some(user), page })?.into_response())
}

pub async fn resume_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(user_id): Path<i64>,
) -> PageResult<Response> {
    let user = match check_plan(&state, user).await? {
        Access::Granted(user) => user,
        Access::Denied(redirect) => return Ok(redirect.into_response()),
    };

    let candidate = state
        .store
        .find_candidate(UserId(user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Candidate"))?;
    Ok(render(ResumeDetailPage {
        user: Some(user),
        candidate,
    })?
    .into_response())
}

pub async fn pricing(MaybeUser(user): MaybeUser) -> PageResult<Response> {
    Ok(render(PricingPage { user })?.into_response())
}
