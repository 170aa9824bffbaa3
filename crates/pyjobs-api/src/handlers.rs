//! Request handlers.

pub mod accounts;
pub mod admin;
pub mod api;
pub mod applications;
pub mod feeds;
pub mod health;
pub mod jobs;
pub mod resumes;

pub use health::*;

use askama::Template;
use axum::response::Html;
use serde::Deserialize;

use crate::error::PageResult;

/// `?page=` as sent by the client, resolved by the listing service.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Render a page template.
pub(crate) fn render<T: Template>(page: T) -> PageResult<Html<String>> {
    Ok(Html(page.render()?))
}

/// Validation failures as one line per problem, sorted for stable output.
pub(crate) fn form_errors(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut lines: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let reason = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                if *field == "__all__" {
                    reason
                } else {
                    format!("{}: {}", field.replace('_', " "), reason)
                }
            })
        })
        .collect();
    lines.sort();
    lines
}
