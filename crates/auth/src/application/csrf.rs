//! CSRF token derivation and validation
//!
//! Tokens are derived from the session id, so they need no storage and
//! rotate with the session: `base64url(HMAC-SHA256(secret, "csrf:" +
//! session_uuid))`. Validation recomputes and compares in constant time.

use kernel::id::SessionId;
use platform::crypto::{constant_time_eq, from_base64_url, hmac_sha256, to_base64_url};

/// Derive the CSRF token for a session
pub fn csrf_token(secret: &[u8; 32], session_id: &SessionId) -> String {
    let payload = format!("csrf:{}", session_id.as_uuid());
    to_base64_url(&hmac_sha256(secret, payload.as_bytes()))
}

/// Check a submitted token against the session it claims to protect
pub fn csrf_token_valid(secret: &[u8; 32], session_id: &SessionId, submitted: &str) -> bool {
    let Ok(submitted_bytes) = from_base64_url(submitted) else {
        return false;
    };
    let payload = format!("csrf:{}", session_id.as_uuid());
    let expected = hmac_sha256(secret, payload.as_bytes());
    constant_time_eq(&expected, &submitted_bytes)
}
