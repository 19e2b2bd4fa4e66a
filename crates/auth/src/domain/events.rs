//! Authentication lifecycle events

use kernel::id::{SessionId, UserId};

use crate::domain::value_object::ChallengePurpose;

/// Notable moments in the authentication lifecycle
///
/// Emitted through an [`EventSink`] so the flows stay decoupled from
/// whatever consumes them (logging today, audit trail later).
#[derive(Debug, Clone)]
pub enum AuthEvent {
    LoginFailed {
        user_id: Option<UserId>,
        reason: &'static str,
    },
    LoginLockedOut {
        user_id: UserId,
    },
    ChallengeIssued {
        user_id: UserId,
        purpose: ChallengePurpose,
    },
    ChallengeFailed {
        user_id: UserId,
        purpose: ChallengePurpose,
        remaining_attempts: u16,
    },
    ChallengeExpired {
        user_id: UserId,
        purpose: ChallengePurpose,
    },
    SessionCreated {
        session_id: SessionId,
        user_id: UserId,
        trusted: bool,
    },
    SessionIdleTimeout {
        session_id: SessionId,
        user_id: UserId,
    },
    SessionTerminated {
        session_id: SessionId,
    },
    SessionsTerminated {
        user_id: UserId,
        count: u64,
    },
    RateLimited {
        action: &'static str,
        client_key: String,
    },
}

/// Consumer of authentication events
///
/// Implementations must be cheap and non-blocking; flows emit inline.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AuthEvent);
}

/// Sink that drops everything; for tests
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: AuthEvent) {}
}
