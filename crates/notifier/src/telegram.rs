//! Telegram Bot API delivery for VOD alerts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use vodwatch_common::config::AppConfig;
use vodwatch_common::error::AppError;
use vodwatch_common::types::VodAlert;

use crate::ChatNotifier;

/// Sends alerts through `sendMessage` with legacy Markdown formatting.
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_url: String,
        bot_token: String,
        chat_id: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::http)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.telegram_api_url.clone(),
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl ChatNotifier for TelegramNotifier {
    async fn send_vod_alert(&self, alert: &VodAlert) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&json!({
                "chat_id": self.chat_id,
                "text": format_alert(alert),
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .map_err(AppError::http)?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "telegram sendMessage returned {}",
                response.status()
            )));
        }

        tracing::info!(vod_url = %alert.vod_url, "Telegram alert sent");
        Ok(())
    }
}

/// Render the alert text.
pub fn format_alert(alert: &VodAlert) -> String {
    format!(
        "{} только что завершил стрим\n{}.\n[Смотреть]({})",
        italic(&alert.streamer_name),
        italic(&alert.title),
        alert.vod_url
    )
}

/// Wrap text in a legacy Markdown italic entity.
///
/// Legacy Markdown forbids escapes inside an entity, so every marker character
/// (`_`, `*`, `` ` ``, `[`) closes the entity, is emitted escaped, and the entity is reopened
/// for the next run of plain text. Empty runs are never wrapped.
pub fn italic(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    let mut run = String::new();
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            push_italic_run(&mut out, &mut run);
            out.push('\\');
            out.push(c);
        } else {
            run.push(c);
        }
    }
    push_italic_run(&mut out, &mut run);
    out
}

fn push_italic_run(out: &mut String, run: &mut String) {
    if run.is_empty() {
        return;
    }
    out.push('_');
    out.push_str(run);
    out.push('_');
    run.clear();
}
