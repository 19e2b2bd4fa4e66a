//! Signed opaque tokens
//!
//! Two token shapes, both HMAC-SHA256 over the payload with the
//! application secret:
//!
//! * session token: `{session_uuid}.{sig}` stored in the session cookie
//! * pending token: `{user_uuid}.{purpose}.{sig}` stored in the
//!   short-lived pending-verification cookie
//!
//! The signature only proves the value came from us; validity is always
//! decided against the database record it points at.

use uuid::Uuid;

use platform::crypto::{constant_time_eq, from_base64_url, hmac_sha256, to_base64_url};

use crate::domain::value_object::ChallengePurpose;

fn sign(secret: &[u8; 32], payload: &str) -> String {
    to_base64_url(&hmac_sha256(secret, payload.as_bytes()))
}

fn verify(secret: &[u8; 32], payload: &str, sig: &str) -> bool {
    let Ok(sig_bytes) = from_base64_url(sig) else {
        return false;
    };
    let expected = hmac_sha256(secret, payload.as_bytes());
    constant_time_eq(&expected, &sig_bytes)
}

/// Produce a session token for the cookie
pub fn sign_session_token(secret: &[u8; 32], session_id: &Uuid) -> String {
    let payload = session_id.to_string();
    let sig = sign(secret, &payload);
    format!("{payload}.{sig}")
}

/// Recover the session id from a cookie value; `None` on any mismatch
pub fn parse_session_token(secret: &[u8; 32], token: &str) -> Option<Uuid> {
    let (payload, sig) = token.split_once('.')?;
    if !verify(secret, payload, sig) {
        return None;
    }
    Uuid::parse_str(payload).ok()
}

/// Produce a pending-verification token correlating the browser with a
/// stored challenge
pub fn sign_pending_token(
    secret: &[u8; 32],
    user_id: &Uuid,
    purpose: ChallengePurpose,
) -> String {
    let payload = format!("{}.{}", user_id, purpose.token_code());
    let sig = sign(secret, &payload);
    format!("{payload}.{sig}")
}

/// Recover `(user_id, purpose)` from a pending token
pub fn parse_pending_token(
    secret: &[u8; 32],
    token: &str,
) -> Option<(Uuid, ChallengePurpose)> {
    let (payload, sig) = token.rsplit_once('.')?;
    if !verify(secret, payload, sig) {
        return None;
    }
    let (uuid_part, code) = payload.split_once('.')?;
    let user_id = Uuid::parse_str(uuid_part).ok()?;
    let purpose = ChallengePurpose::from_token_code(code)?;
    Some((user_id, purpose))
}
