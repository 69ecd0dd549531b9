//! Inbound EventSub payload classification.
//!
//! The webhook body is classified once at the boundary so the handler can
//! dispatch on a closed set of shapes instead of probing optional JSON fields.

use serde::Deserialize;
use serde_json::Value;

/// Subscription type announcing that a broadcast has ended.
pub const STREAM_OFFLINE: &str = "stream.offline";

/// Value of `Twitch-Eventsub-Message-Type` for revoked subscriptions.
pub const MESSAGE_TYPE_REVOCATION: &str = "revocation";

/// Subscription metadata attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Event body of a `stream.offline` notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamOfflineEvent {
    pub broadcaster_user_id: String,
    #[serde(default)]
    pub broadcaster_user_login: Option<String>,
    #[serde(default)]
    pub broadcaster_user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subscription: Subscription,
    /// Left untyped here; decoded per subscription type by the caller
    pub event: Option<Value>,
}

impl Notification {
    pub fn is_stream_offline(&self) -> bool {
        self.subscription.kind == STREAM_OFFLINE
    }

    /// Decode the event as a `stream.offline` body, if it is one.
    pub fn stream_offline_event(&self) -> Option<StreamOfflineEvent> {
        if !self.is_stream_offline() {
            return None;
        }
        self.event
            .as_ref()
            .and_then(|event| serde_json::from_value(event.clone()).ok())
    }
}

/// Shape of an inbound webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSubPayload {
    /// Empty body or JSON `null`
    Missing,
    /// Non-empty body that is not JSON
    Malformed,
    /// Subscription handshake; the value must be echoed back verbatim
    Challenge(String),
    Notification(Notification),
    /// Valid JSON that is neither a challenge nor a notification
    Unknown(Value),
}

#[derive(Deserialize)]
struct NotificationWire {
    subscription: Subscription,
    #[serde(default)]
    event: Option<Value>,
}

impl EventSubPayload {
    pub fn parse(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return EventSubPayload::Missing;
        }

        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return EventSubPayload::Malformed,
        };

        if value.is_null() {
            return EventSubPayload::Missing;
        }

        if let Some(challenge) = value.get("challenge").and_then(challenge_text) {
            return EventSubPayload::Challenge(challenge);
        }

        match serde_json::from_value::<NotificationWire>(value.clone()) {
            Ok(wire) => EventSubPayload::Notification(Notification {
                subscription: wire.subscription,
                event: wire.event,
            }),
            Err(_) => EventSubPayload::Unknown(value),
        }
    }

    /// Body as JSON for audit logging.
    pub fn raw_json(body: &[u8]) -> Value {
        if body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    }
}

/// Falsy values (`null`, `false`, `0`, `""`) do not count as a challenge.
fn challenge_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
