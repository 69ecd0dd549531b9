//! Raw-request audit log backed by a Google Apps Script endpoint.
//!
//! The script appends each posted record as a spreadsheet row. Records are
//! wrapped as `{ "token": <secret>, "data": <record> }`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;

use vodwatch_common::config::AppConfig;
use vodwatch_common::error::AppError;
use vodwatch_common::types::AuditRecord;

use crate::AuditSink;

#[derive(Serialize)]
struct AuditEnvelope<'a> {
    token: &'a str,
    data: &'a AuditRecord,
}

pub struct GoogleScriptSink {
    client: Client,
    url: String,
    token: String,
}

impl GoogleScriptSink {
    pub fn new(url: String, token: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::http)?;

        Ok(Self { client, url, token })
    }

    /// Build the sink when audit logging is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, AppError> {
        match (&config.audit_url, &config.audit_secret) {
            (Some(url), Some(token)) => Self::new(
                url.clone(),
                token.clone(),
                Duration::from_secs(config.http_timeout_secs),
            )
            .map(Some),
            (Some(_), None) => Err(AppError::Config(
                "audit URL configured without a secret".to_string(),
            )),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl AuditSink for GoogleScriptSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AuditEnvelope {
                token: &self.token,
                data: &record,
            })
            .send()
            .await
            .map_err(AppError::http)?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "audit sink returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Assemble a record stamped with the current time.
pub fn new_record(
    raw_body: serde_json::Value,
    ip: String,
    valid_sign: bool,
    url: Option<String>,
) -> AuditRecord {
    AuditRecord {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        raw_body,
        ip,
        valid_sign,
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let record = new_record(
            serde_json::json!({"subscription": {"type": "stream.offline"}}),
            "203.0.113.7".to_string(),
            true,
            Some("https://twitch.tv/videos/1".to_string()),
        );
        let json = serde_json::to_value(AuditEnvelope {
            token: "sheet-token",
            data: &record,
        })
        .unwrap();

        assert_eq!(json["token"], "sheet-token");
        assert_eq!(json["data"]["ip"], "203.0.113.7");
        assert_eq!(json["data"]["validSign"], true);
        assert_eq!(json["data"]["url"], "https://twitch.tv/videos/1");
        assert_eq!(json["data"]["raw_body"]["subscription"]["type"], "stream.offline");
    }

    #[test]
    fn test_record_timestamp_is_rfc3339_utc() {
        let record = new_record(serde_json::Value::Null, "unknown".to_string(), false, None);
        assert!(record.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }
}
