//! Stored password credential with failure tracking

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use platform::password::{ClearTextPassword, HashedPassword};

/// Consecutive failures before the credential locks
pub const MAX_LOGIN_FAILURES: u16 = 5;

/// How long a lockout lasts
pub const LOCKOUT_MINUTES: i64 = 15;

/// Password credential for one user
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: UserId,
    pub password_hash: HashedPassword,
    pub login_failed_count: u16,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Whether the credential is currently locked out
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some_and(|until| until > Utc::now())
    }

    /// Verify a password attempt against the stored hash
    pub fn verify_password(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        self.password_hash.verify(password, pepper)
    }

    /// Record a failed attempt; locks once the threshold is reached
    pub fn record_failure(&mut self) {
        let now = Utc::now();
        self.login_failed_count = self.login_failed_count.saturating_add(1);
        self.last_failed_at = Some(now);
        if self.login_failed_count >= MAX_LOGIN_FAILURES {
            self.locked_until = Some(now + Duration::minutes(LOCKOUT_MINUTES));
        }
        self.updated_at = now;
    }

    /// Clear the failure state after a successful verification
    pub fn reset_failures(&mut self) {
        self.login_failed_count = 0;
        self.last_failed_at = None;
        self.locked_until = None;
        self.updated_at = Utc::now();
    }
}
