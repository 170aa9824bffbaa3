//! RSS feed endpoints.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::error::ApiResult;
use crate::services::{build_feed, FeedKind};
use crate::state::AppState;

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

async fn feed_response(state: &AppState, kind: FeedKind) -> ApiResult<Response> {
    let xml = build_feed(state.store.as_ref(), &state.config.site_url, kind, Utc::now()).await?;
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response())
}

/// Newest public jobs.
pub async fn jobs_feed(State(state): State<AppState>) -> ApiResult<Response> {
    feed_response(&state, FeedKind::All).await
}

/// Jobs inside their premium window.
pub async fn premium_feed(State(state): State<AppState>) -> ApiResult<Response> {
    feed_response(&state, FeedKind::Premium).await
}
