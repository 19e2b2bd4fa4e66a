//! User account entity

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::value_object::AccountStatus;

/// A user account as the authentication core sees it
///
/// Profile data beyond what sign-in needs lives elsewhere; this entity
/// carries identity, status and the per-user session preferences.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub status: AccountStatus,
    /// Whether sign-in requires the email code step
    pub second_factor_required: bool,
    /// Per-user idle timeout preference in seconds, if set
    pub idle_timeout_secs: Option<i32>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }

    /// Record a completed sign-in
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn last_login_at_ms(&self) -> Option<i64> {
        self.last_login_at.map(|t| t.timestamp_millis())
    }
}

/// Canonical form used for username lookups and uniqueness
pub fn canonical_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            user_id: UserId::new(),
            username: "carol".to_string(),
            email: Some("carol@example.com".to_string()),
            status: AccountStatus::Active,
            second_factor_required: true,
            idle_timeout_secs: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_record_login_sets_timestamp() {
        let mut user = sample_user();
        assert!(user.last_login_at.is_none());
        user.record_login();
        assert!(user.last_login_at.is_some());
        assert_eq!(user.last_login_at, Some(user.updated_at));
    }

    #[test]
    fn test_disabled_user_cannot_login() {
        let mut user = sample_user();
        assert!(user.can_login());
        user.status = AccountStatus::Disabled;
        assert!(!user.can_login());
    }

    #[test]
    fn test_canonical_username() {
        assert_eq!(canonical_username("  Carol "), "carol");
        assert_eq!(canonical_username("ADMIN"), "admin");
    }
}
