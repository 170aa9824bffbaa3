//! PyJobs web server.
//!
//! This crate provides:
//! - Server-rendered job board pages with session login
//! - The application lifecycle: apply, challenge, close links, feedback
//! - RSS feeds, CSV export and a read-only REST API
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod views;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, PageError, PageResult};
pub use routes::create_router;
pub use services::{ApplicationLifecycle, Notification, Notifier};
pub use state::AppState;
