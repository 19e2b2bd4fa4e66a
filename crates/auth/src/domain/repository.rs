//! Repository traits for authentication storage

use chrono::{DateTime, Utc};
use kernel::id::{SessionId, UserId};
use platform::rate_limit::{RateLimitConfig, RateLimitDecision};

use crate::domain::entity::{Credential, PendingChallenge, User, UserSession};
use crate::domain::value_object::ChallengePurpose;
use crate::error::AuthResult;

#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Lookup by canonical (lowercased) username
    async fn find_user_by_username(&self, canonical: &str) -> AuthResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    async fn update_user(&self, user: &User) -> AuthResult<()>;
}

#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>>;

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()>;
}

#[trait_variant::make(ChallengeRepository: Send)]
pub trait LocalChallengeRepository {
    /// Store a challenge, replacing any existing one for the same
    /// `(user_id, purpose)` pair
    async fn replace_challenge(&self, challenge: &PendingChallenge) -> AuthResult<()>;

    async fn find_challenge(
        &self,
        user_id: &UserId,
        purpose: ChallengePurpose,
    ) -> AuthResult<Option<PendingChallenge>>;

    /// Persist attempt/used-flag changes
    async fn update_challenge(&self, challenge: &PendingChallenge) -> AuthResult<()>;

    async fn delete_challenge(&self, user_id: &UserId, purpose: ChallengePurpose)
    -> AuthResult<()>;
}

#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn create_session(&self, session: &UserSession) -> AuthResult<()>;

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<UserSession>>;

    /// Persist a slid idle window and/or extended hard expiry
    async fn update_session_activity(&self, session: &UserSession) -> AuthResult<()>;

    /// Active sessions for a user, most recently active first
    async fn list_active_sessions(&self, user_id: &UserId) -> AuthResult<Vec<UserSession>>;

    /// Clear the active flag; succeeds whether or not the session was live
    async fn terminate_session(&self, session_id: &SessionId) -> AuthResult<()>;

    /// Terminate a session only if it belongs to `user_id`; returns whether
    /// the session was found under that owner
    async fn terminate_owned_session(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> AuthResult<bool>;

    /// Terminate every active session for a user created at or before
    /// `created_before`, optionally sparing one; returns the count
    async fn terminate_user_sessions(
        &self,
        user_id: &UserId,
        spare: Option<&SessionId>,
        created_before: DateTime<Utc>,
    ) -> AuthResult<u64>;
}

#[trait_variant::make(RateLimitRepository: Send)]
pub trait LocalRateLimitRepository {
    /// Record a hit against `(action, client_key)` and return the decision
    /// for the window the hit landed in
    async fn record_hit(
        &self,
        action: &str,
        client_key: &str,
        config: &RateLimitConfig,
    ) -> AuthResult<RateLimitDecision>;
}

/// Periodic/startup removal of rows that can no longer affect behavior
#[trait_variant::make(MaintenanceRepository: Send)]
pub trait LocalMaintenanceRepository {
    /// Delete expired challenges, dead sessions and stale rate-limit
    /// windows; returns the total rows removed
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Everything the HTTP surface needs from one storage backend
pub trait AuthStore:
    UserRepository
    + CredentialRepository
    + ChallengeRepository
    + SessionRepository
    + RateLimitRepository
    + MaintenanceRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + CredentialRepository
        + ChallengeRepository
        + SessionRepository
        + RateLimitRepository
        + MaintenanceRepository
        + Send
        + Sync
        + 'static
{
}
