//! Outbound delivery: chat alerts and the raw-request audit log.

pub mod audit;
pub mod telegram;

use async_trait::async_trait;
use mockall::automock;

use vodwatch_common::error::AppError;
use vodwatch_common::types::{AuditRecord, VodAlert};

pub use audit::GoogleScriptSink;
pub use telegram::TelegramNotifier;

/// Delivers a VOD alert to the configured chat.
#[automock]
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send_vod_alert(&self, alert: &VodAlert) -> Result<(), AppError>;
}

/// Receives one record per handled webhook request.
#[automock]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AppError>;
}
