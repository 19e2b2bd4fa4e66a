//! Outbound code delivery

use crate::domain::value_object::ChallengePurpose;

/// Everything a delivery channel needs to send one code
///
/// Owns its fields so the notifier can hand the work to a background
/// task without borrowing from the request.
#[derive(Clone)]
pub struct OtpDelivery {
    pub email: Option<String>,
    pub username: String,
    pub code: String,
    pub purpose: ChallengePurpose,
    pub expires_in_secs: u64,
}

impl std::fmt::Debug for OtpDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpDelivery")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("code", &"[REDACTED]")
            .field("purpose", &self.purpose)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Hands generated codes to an external delivery channel
///
/// Dispatch is fire-and-forget: delivery failure must not fail the
/// request that issued the code, so implementations queue or spawn
/// internally and report problems through their own logging.
pub trait OtpNotifier: Send + Sync {
    fn dispatch(&self, delivery: OtpDelivery);
}
