use serde::{Deserialize, Serialize};

/// A single entry from the Helix video listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    /// Display name of the broadcaster who owns the video
    pub user_name: String,
    /// Not every listing carries the game; absent means "unknown"
    #[serde(default)]
    pub game_name: Option<String>,
}

/// Everything needed to announce a finished stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VodAlert {
    pub title: String,
    pub streamer_name: String,
    pub vod_url: String,
}

/// Outcome of the stream-end policy for one `stream.offline` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationDecision {
    /// No video, or the latest video does not satisfy the policy
    Skip,
    Notify(VodAlert),
}

impl NotificationDecision {
    pub fn should_notify(&self) -> bool {
        matches!(self, NotificationDecision::Notify(_))
    }

    pub fn alert(&self) -> Option<&VodAlert> {
        match self {
            NotificationDecision::Notify(alert) => Some(alert),
            NotificationDecision::Skip => None,
        }
    }
}

/// One raw-request row sent to the audit sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// RFC 3339 timestamp of when the request was handled
    pub timestamp: String,
    /// Request body as JSON, or as a string when it was not valid JSON
    pub raw_body: serde_json::Value,
    /// First `X-Forwarded-For` entry, or "unknown"
    pub ip: String,
    #[serde(rename = "validSign")]
    pub valid_sign: bool,
    /// VOD link, present only when an alert was sent for this request
    pub url: Option<String>,
}
