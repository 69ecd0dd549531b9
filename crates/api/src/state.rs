//! Shared application state for the Axum server.

use std::sync::Arc;

use vodwatch_common::config::AppConfig;
use vodwatch_common::error::AppError;
use vodwatch_engine::policy::StreamEndPolicy;
use vodwatch_engine::twitch::{HelixClient, TwitchApi};
use vodwatch_notifier::{AuditSink, ChatNotifier, GoogleScriptSink, TelegramNotifier};

/// Application state shared across all route handlers via Axum `State`.
///
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub policy: Arc<StreamEndPolicy>,
    pub twitch: Arc<dyn TwitchApi>,
    pub notifier: Arc<dyn ChatNotifier>,
    /// `None` when audit logging is not configured
    pub audit: Option<Arc<dyn AuditSink>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        twitch: Arc<dyn TwitchApi>,
        notifier: Arc<dyn ChatNotifier>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        let policy = StreamEndPolicy::from_config(&config);
        Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            twitch,
            notifier,
            audit,
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let twitch = Arc::new(HelixClient::from_config(&config)?);
        let notifier = Arc::new(TelegramNotifier::from_config(&config)?);
        let audit = GoogleScriptSink::from_config(&config)?
            .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>);

        Ok(Self::new(config, twitch, notifier, audit))
    }
}
