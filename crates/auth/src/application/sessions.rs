//! Session listing and renewal

use std::sync::Arc;

use crate::application::check_session::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::entity::{SessionInfo, UserSession};
use crate::domain::events::EventSink;
use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;

/// List the caller's active sessions for self-service review
pub struct ListSessionsUseCase<R> {
    repo: Arc<R>,
    checker: CheckSessionUseCase<R>,
}

impl<R> ListSessionsUseCase<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventSink>) -> Self {
        Self {
            checker: CheckSessionUseCase::new(repo.clone(), config, events),
            repo,
        }
    }

    pub async fn execute(&self, session_token: Option<&str>) -> AuthResult<Vec<SessionInfo>> {
        let caller = self.checker.resolve(session_token).await?;

        let sessions = self.repo.list_active_sessions(&caller.user_id).await?;
        Ok(sessions
            .into_iter()
            // The store filters the active flag and hard expiry; idle
            // expiry is time math done here.
            .filter(|s| !s.is_idle_expired())
            .map(|s| SessionInfo {
                is_current: s.session_id == caller.session_id,
                session_id: s.session_id,
                device: s.device,
                origin: s.origin,
                created_at: s.created_at,
                last_activity_at: s.last_activity_at,
            })
            .collect())
    }
}

/// Extend the caller's hard expiry by a fresh lifetime
///
/// Takes the session the handler already resolved for CSRF, so refresh
/// costs one store write, not an extra lookup.
pub struct RefreshSessionUseCase<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> RefreshSessionUseCase<R>
where
    R: SessionRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Returns the new hard expiry in epoch milliseconds and the cookie
    /// lifetime to re-issue
    pub async fn execute(&self, mut session: UserSession) -> AuthResult<(i64, i64)> {
        let lifetime_secs = self.config.session_lifetime_secs(session.trusted);
        session.extend(lifetime_secs);
        self.repo.update_session_activity(&session).await?;

        Ok((session.expires_at_ms, lifetime_secs))
    }
}
