//! Application state.

use std::sync::Arc;

use tracing::info;

use pyjobs_db::Store;
use pyjobs_models::{CloseHasher, ModelError};

use crate::auth::SessionKeys;
use crate::config::ApiConfig;
use crate::services::{ApplicationLifecycle, LogNotifier, Notifier, NotifyError, WebhookNotifier};

/// Errors while assembling the state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid secret key: {0}")]
    Secret(#[from] ModelError),

    #[error("Failed to create notifier: {0}")]
    Notifier(#[from] NotifyError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionKeys>,
    pub lifecycle: ApplicationLifecycle,
}

impl AppState {
    /// Create application state, choosing the notifier from the config.
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Result<Self, StateError> {
        let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
            Some(url) => {
                info!(url = %url, "Notifications go to webhook");
                Arc::new(WebhookNotifier::new(url.clone())?)
            }
            None => Arc::new(LogNotifier),
        };
        Self::with_notifier(config, store, notifier)
    }

    /// Create application state with an explicit notifier.
    pub fn with_notifier(
        config: ApiConfig,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StateError> {
        let hasher = CloseHasher::new(&config.secret_key)?;
        let sessions = SessionKeys::new(&config.secret_key, config.session_ttl, config.is_production());
        let lifecycle = ApplicationLifecycle::new(Arc::clone(&store), hasher, notifier, config.site_url.clone());

        Ok(Self {
            config,
            store,
            sessions: Arc::new(sessions),
            lifecycle,
        })
    }
}
