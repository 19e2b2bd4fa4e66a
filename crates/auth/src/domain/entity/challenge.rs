//! Pending verification challenge

use chrono::{DateTime, Duration, Utc};
use kernel::id::{ChallengeId, UserId};
use platform::crypto::constant_time_eq;

use crate::domain::value_object::{ChallengePurpose, OtpCode};

/// A one-time code waiting to be verified
///
/// Keyed by `(user_id, purpose)`: issuing a new challenge for the same
/// pair replaces any earlier one, so stale codes stop verifying the
/// moment a fresh code goes out.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub challenge_id: ChallengeId,
    pub user_id: UserId,
    pub purpose: ChallengePurpose,
    /// SHA-256 of the code; the cleartext is never stored
    pub code_digest: Vec<u8>,
    /// Flipped once a code verifies; a used challenge never verifies again
    pub used: bool,
    pub attempts_remaining: i16,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingChallenge {
    pub fn new(
        user_id: UserId,
        purpose: ChallengePurpose,
        code: &OtpCode,
        ttl_secs: i64,
        max_attempts: u16,
    ) -> Self {
        let now = Utc::now();
        Self {
            challenge_id: ChallengeId::new(),
            user_id,
            purpose,
            code_digest: code.digest().to_vec(),
            used: false,
            attempts_remaining: max_attempts as i16,
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Whether the challenge can still accept a verification attempt
    pub fn is_verifiable(&self) -> bool {
        !self.used && !self.is_expired() && self.attempts_remaining > 0
    }

    /// Compare a submitted code against the stored digest
    pub fn code_matches(&self, code: &OtpCode) -> bool {
        constant_time_eq(&self.code_digest, &code.digest())
    }

    /// Consume one attempt after a mismatch; returns the new remaining count
    pub fn record_mismatch(&mut self) -> u16 {
        self.attempts_remaining = (self.attempts_remaining - 1).max(0);
        self.attempts_remaining as u16
    }

    /// Mark verified; irreversible
    pub fn mark_used(&mut self) {
        self.used = true;
    }
}
