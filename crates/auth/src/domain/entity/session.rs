//! Server-side session entity

use chrono::{DateTime, Duration, Utc};
use kernel::id::{SessionId, UserId};

/// A server-side session record
///
/// A session is live while all three hold: the `active` flag is set, the
/// hard expiry (`expires_at_ms`) has not passed, and the idle window since
/// `last_activity_at` has not elapsed. Termination clears `active` and is
/// idempotent.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// Device descriptor (User-Agent) captured at creation
    pub device: Option<String>,
    /// Origin IP captured at creation
    pub origin: Option<String>,
    /// Created from a verified trusted-device sign-in (longer hard lifetime)
    pub trusted: bool,
    pub active: bool,
    pub idle_timeout_secs: i64,
    /// Hard expiry as epoch milliseconds
    pub expires_at_ms: i64,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(
        user_id: UserId,
        device: Option<String>,
        origin: Option<String>,
        trusted: bool,
        lifetime_secs: i64,
        idle_timeout_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            user_id,
            device,
            origin,
            trusted,
            active: true,
            idle_timeout_secs,
            expires_at_ms: now.timestamp_millis() + lifetime_secs * 1000,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn is_hard_expired(&self) -> bool {
        Utc::now().timestamp_millis() >= self.expires_at_ms
    }

    /// Seconds left in the idle window, floored at zero
    pub fn idle_remaining_secs(&self) -> i64 {
        let idle_for = (Utc::now() - self.last_activity_at).num_seconds();
        (self.idle_timeout_secs - idle_for).max(0)
    }

    pub fn is_idle_expired(&self) -> bool {
        self.idle_remaining_secs() == 0
    }

    pub fn is_valid(&self) -> bool {
        self.active && !self.is_hard_expired() && !self.is_idle_expired()
    }

    /// Slide the idle window forward
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Extend the hard expiry from now by `lifetime_secs`
    pub fn extend(&mut self, lifetime_secs: i64) {
        self.expires_at_ms = Utc::now().timestamp_millis() + lifetime_secs * 1000;
        self.touch();
    }

    pub fn terminate(&mut self) {
        self.active = false;
    }

    pub fn activity_status(&self) -> ActivityStatus {
        ActivityStatus {
            session_valid: self.is_valid(),
            degraded: false,
            remaining_secs: self.idle_remaining_secs(),
            idle_timeout_secs: self.idle_timeout_secs,
            expires_at_ms: Some(self.expires_at_ms),
        }
    }
}

/// Idle-window snapshot reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityStatus {
    pub session_valid: bool,
    /// Computed from client-declared activity instead of a resolvable session
    pub degraded: bool,
    pub remaining_secs: i64,
    pub idle_timeout_secs: i64,
    pub expires_at_ms: Option<i64>,
}

impl ActivityStatus {
    /// Status when no session could be resolved and the client declared
    /// nothing usable
    pub fn invalid(idle_timeout_secs: i64) -> Self {
        Self {
            session_valid: false,
            degraded: false,
            remaining_secs: 0,
            idle_timeout_secs,
            expires_at_ms: None,
        }
    }
}

/// Fallback view when the session store cannot resolve the caller
///
/// Computed purely from the activity timestamp the client declared; it
/// never extends or validates anything server-side.
#[derive(Debug, Clone, Copy)]
pub struct DegradedSession {
    pub last_activity_at: DateTime<Utc>,
    pub idle_timeout_secs: i64,
}

impl DegradedSession {
    pub fn from_declared_ms(last_activity_ms: i64, idle_timeout_secs: i64) -> Option<Self> {
        let last_activity_at = DateTime::from_timestamp_millis(last_activity_ms)?;
        Some(Self {
            last_activity_at,
            idle_timeout_secs,
        })
    }

    /// Seconds left in the declared idle window, clamped to
    /// `0..=idle_timeout_secs` so a future-dated declaration cannot
    /// report more time than the window holds
    pub fn remaining_secs(&self) -> i64 {
        let idle_for = (Utc::now() - self.last_activity_at).num_seconds();
        (self.idle_timeout_secs - idle_for).clamp(0, self.idle_timeout_secs)
    }

    pub fn activity_status(&self) -> ActivityStatus {
        ActivityStatus {
            session_valid: false,
            degraded: true,
            remaining_secs: self.remaining_secs(),
            idle_timeout_secs: self.idle_timeout_secs,
            expires_at_ms: None,
        }
    }
}

/// Session metadata exposed by the listing endpoint
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub device: Option<String>,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub is_current: bool,
}
