//! EventSub webhook receiver.
//!
//! Dispatch order, terminal on first match:
//! 1. non-POST is answered 405 by the method router
//! 2. challenge payloads are echoed back, signature or not
//! 3. absent or non-JSON bodies get 200 with an error marker
//! 4. bad signatures get 403
//! 5. `stream.offline` runs the stream-end policy and may send an alert;
//!    lookup or delivery failures get 500
//! 6. everything else gets `{"status":"OK"}`

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::json;

use vodwatch_common::error::AppError;
use vodwatch_common::types::{NotificationDecision, VodAlert};
use vodwatch_engine::payload::{EventSubPayload, MESSAGE_TYPE_REVOCATION, Notification};
use vodwatch_engine::signature::{
    HEADER_MESSAGE_ID, HEADER_MESSAGE_TYPE, HEADER_SIGNATURE, HEADER_TIMESTAMP, verify_signature,
};
use vodwatch_notifier::audit::new_record;

use crate::state::AppState;

pub const WEBHOOK_PATH: &str = "/api/webhook";

const FORWARDED_FOR: &str = "x-forwarded-for";

pub fn router() -> Router<AppState> {
    Router::new().route(WEBHOOK_PATH, post(receive_event))
}

/// How a single delivery was answered.
#[derive(Debug)]
enum WebhookOutcome {
    Challenge(String),
    NoBody,
    InvalidBody,
    InvalidSignature,
    Accepted,
    Failed(AppError),
}

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        match self {
            WebhookOutcome::Challenge(challenge) => (StatusCode::OK, challenge).into_response(),
            WebhookOutcome::NoBody => {
                (StatusCode::OK, Json(json!({ "error": "No body provided" }))).into_response()
            }
            WebhookOutcome::InvalidBody => {
                (StatusCode::OK, Json(json!({ "error": "Invalid body" }))).into_response()
            }
            WebhookOutcome::InvalidSignature => {
                AppError::Auth("EventSub signature mismatch".to_string()).into_response()
            }
            WebhookOutcome::Accepted => {
                (StatusCode::OK, Json(json!({ "status": "OK" }))).into_response()
            }
            WebhookOutcome::Failed(err) => err.into_response(),
        }
    }
}

/// POST /api/webhook
async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = EventSubPayload::parse(&body);
    let valid_sign = verify_signature(
        &state.config.webhook_secret,
        header(&headers, HEADER_MESSAGE_ID),
        header(&headers, HEADER_TIMESTAMP),
        &body,
        header(&headers, HEADER_SIGNATURE),
    );

    let (outcome, sent) = dispatch(&state, payload, valid_sign, &headers).await;

    if let Some(audit) = state.audit.clone() {
        let record = new_record(
            EventSubPayload::raw_json(&body),
            client_ip(&headers),
            valid_sign,
            sent.map(|alert| alert.vod_url),
        );
        tokio::spawn(async move {
            if let Err(e) = audit.record(record).await {
                tracing::warn!(error = %e, "Failed to write audit record");
            }
        });
    }

    outcome.into_response()
}

/// Returns the outcome plus the alert, if one was delivered.
async fn dispatch(
    state: &AppState,
    payload: EventSubPayload,
    valid_sign: bool,
    headers: &HeaderMap,
) -> (WebhookOutcome, Option<VodAlert>) {
    let notification = match payload {
        EventSubPayload::Challenge(challenge) => {
            tracing::info!("Received subscription challenge, responding");
            return (WebhookOutcome::Challenge(challenge), None);
        }
        EventSubPayload::Missing => return (WebhookOutcome::NoBody, None),
        EventSubPayload::Malformed => return (WebhookOutcome::InvalidBody, None),
        _ if !valid_sign => {
            tracing::warn!(
                message_id = ?header(headers, HEADER_MESSAGE_ID),
                "Rejected delivery with invalid signature"
            );
            return (WebhookOutcome::InvalidSignature, None);
        }
        EventSubPayload::Notification(notification) => notification,
        EventSubPayload::Unknown(_) => {
            tracing::debug!("Signed payload without subscription, ignoring");
            return (WebhookOutcome::Accepted, None);
        }
    };

    if header(headers, HEADER_MESSAGE_TYPE) == Some(MESSAGE_TYPE_REVOCATION) {
        tracing::warn!(
            subscription_id = ?notification.subscription.id,
            subscription_type = %notification.subscription.kind,
            status = ?notification.subscription.status,
            "EventSub subscription revoked"
        );
        return (WebhookOutcome::Accepted, None);
    }

    if !notification.is_stream_offline() {
        tracing::debug!(
            subscription_type = %notification.subscription.kind,
            "Ignoring event type"
        );
        return (WebhookOutcome::Accepted, None);
    }

    handle_stream_offline(state, &notification).await
}

async fn handle_stream_offline(
    state: &AppState,
    notification: &Notification,
) -> (WebhookOutcome, Option<VodAlert>) {
    match notification.stream_offline_event() {
        Some(event) => tracing::info!(
            broadcaster_id = %event.broadcaster_user_id,
            broadcaster_login = ?event.broadcaster_user_login,
            "Stream went offline"
        ),
        None => tracing::info!("Stream went offline (no event body)"),
    }

    let decision = match state.policy.evaluate(state.twitch.as_ref()).await {
        Ok(decision) => decision,
        Err(e) => return (WebhookOutcome::Failed(e), None),
    };

    let NotificationDecision::Notify(alert) = decision else {
        return (WebhookOutcome::Accepted, None);
    };

    match state.notifier.send_vod_alert(&alert).await {
        Ok(()) => (WebhookOutcome::Accepted, Some(alert)),
        Err(e) => {
            tracing::error!(error = %e, vod_url = %alert.vod_url, "Failed to send chat alert");
            (WebhookOutcome::Failed(e), None)
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// First hop of `X-Forwarded-For`, or "unknown".
fn client_ip(headers: &HeaderMap) -> String {
    header(headers, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
