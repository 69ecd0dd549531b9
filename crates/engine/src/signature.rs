//! EventSub message signature verification.
//!
//! Twitch signs every delivery with
//! `sha256=hex(HMAC-SHA256(secret, message_id || timestamp || raw_body))`
//! and sends it in the `Twitch-Eventsub-Message-Signature` header.
//!
//! Header names are kept lower-case so they can be used directly as `HeaderMap` keys.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_MESSAGE_ID: &str = "twitch-eventsub-message-id";
pub const HEADER_TIMESTAMP: &str = "twitch-eventsub-message-timestamp";
pub const HEADER_SIGNATURE: &str = "twitch-eventsub-message-signature";
pub const HEADER_MESSAGE_TYPE: &str = "twitch-eventsub-message-type";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a delivery.
///
/// Returns `None` only if the MAC rejects the key.
pub fn compute_signature(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify a delivery signature.
///
/// Fails closed: an empty secret or any absent/empty input returns `false`.
/// The comparison is constant-time over the whole header value, so upper-case
/// hex or a missing `sha256=` prefix are rejected as well.
pub fn verify_signature(
    secret: &str,
    message_id: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
    signature: Option<&str>,
) -> bool {
    let (Some(message_id), Some(timestamp), Some(signature)) = (message_id, timestamp, signature)
    else {
        return false;
    };
    if secret.is_empty() || message_id.is_empty() || timestamp.is_empty() || signature.is_empty()
    {
        return false;
    }

    let Some(expected) = compute_signature(secret, message_id, timestamp, body) else {
        return false;
    };
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
