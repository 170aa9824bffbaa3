//! Registration, login, logout and the user's own profile.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use pyjobs_db::DbError;
use pyjobs_models::{NewUser, ProfileUpdate, User};

use crate::auth::{hash_password, verify_password, CurrentUser, MaybeUser};
use crate::error::{ApiError, PageResult};
use crate::handlers::{form_errors, render};
use crate::security::{non_blank, safe_next};
use crate::state::AppState;
use crate::views::{LoginPage, ProfilePage, RegisterPage, RegisterValues};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Start a session for `user` and go to `next`.
fn logged_in(state: &AppState, jar: CookieJar, user: &User, next: &str) -> PageResult<Response> {
    let token = state.sessions.issue(user.id)?;
    let jar = jar.add(state.sessions.session_cookie(token));
    Ok((jar, Redirect::to(next)).into_response())
}

pub async fn login_form(MaybeUser(user): MaybeUser, Query(query): Query<NextQuery>) -> PageResult<Response> {
    let next = safe_next(query.next.as_deref());
    if user.is_some() {
        return Ok(Redirect::to(&next).into_response());
    }
    let page = LoginPage {
        user: None,
        next,
        username: String::new(),
        error: None,
    };
    Ok(render(page)?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> PageResult<Response> {
    let next = safe_next(form.next.as_deref());
    let username = form.username.trim();

    let user = state.store.find_user_by_username(username).await?;
    match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => {
            info!(user_id = %user.id, "User logged in");
            logged_in(&state, jar, &user, &next)
        }
        _ => {
            warn!(username = %username, "Failed login");
            let page = LoginPage {
                user: None,
                next,
                username: username.to_string(),
                error: Some("Invalid username or password".to_string()),
            };
            Ok((StatusCode::UNAUTHORIZED, render(page)?).into_response())
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = jar.remove(state.sessions.removal_cookie());
    (jar, Redirect::to("/")).into_response()
}

pub async fn register_form(MaybeUser(user): MaybeUser) -> PageResult<Response> {
    let page = RegisterPage {
        user,
        form: RegisterValues::default(),
        errors: Vec::new(),
    };
    Ok(render(page)?.into_response())
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NewUser>,
) -> PageResult<Response> {
    let form = NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        password: form.password,
    };
    let values = RegisterValues {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
    };
    let rejected = |errors: Vec<String>| -> PageResult<Response> {
        let page = RegisterPage {
            user: None,
            form: values.clone(),
            errors,
        };
        Ok((StatusCode::BAD_REQUEST, render(page)?).into_response())
    };

    if let Err(errors) = form.validate() {
        return rejected(form_errors(&errors));
    }

    let password_hash = hash_password(&form.password)?;
    let is_staff = state.config.is_staff_username(&form.username);
    let user = match state.store.create_user(&form, &password_hash, is_staff).await {
        Ok(user) => user,
        Err(DbError::AlreadyExists(_)) => {
            return rejected(vec!["username: this username is already taken".to_string()]);
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, is_staff, "User registered");
    logged_in(&state, jar, &user, "/profile/")
}

pub async fn profile(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> PageResult<Response> {
    let profile = state
        .store
        .find_profile(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile"))?;
    let page = ProfilePage {
        user: Some(user),
        profile,
        errors: Vec::new(),
        saved: false,
    };
    Ok(render(page)?.into_response())
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub cellphone: Option<String>,
    pub skills: Option<String>,
    pub resume_directory_opt_in: Option<String>,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            github: non_blank(form.github),
            linkedin: non_blank(form.linkedin),
            portfolio: non_blank(form.portfolio),
            cellphone: non_blank(form.cellphone),
            skills: non_blank(form.skills),
            resume_directory_opt_in: form.resume_directory_opt_in.is_some(),
        }
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProfileForm>,
) -> PageResult<Response> {
    let update = ProfileUpdate::from(form);

    if let Err(errors) = update.validate() {
        let mut profile = state
            .store
            .find_profile(user.id)
            .await?
            .ok_or_else(|| ApiError::not_found("Profile"))?;
        profile.github = update.github;
        profile.linkedin = update.linkedin;
        profile.portfolio = update.portfolio;
        profile.cellphone = update.cellphone;
        profile.skills = update.skills;
        profile.resume_directory_opt_in = update.resume_directory_opt_in;

        let page = ProfilePage {
            user: Some(user),
            profile,
            errors: form_errors(&errors),
            saved: false,
        };
        return Ok((StatusCode::BAD_REQUEST, render(page)?).into_response());
    }

    let profile = state.store.update_profile(user.id, &update, Utc::now()).await?;
    info!(user_id = %user.id, opt_in = profile.resume_directory_opt_in, "Profile updated");

    let page = ProfilePage {
        user: Some(user),
        profile,
        errors: Vec::new(),
        saved: true,
    };
    Ok(render(page)?.into_response())
}
