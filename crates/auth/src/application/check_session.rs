//! Session resolution and status

use std::sync::Arc;

use kernel::id::SessionId;

use crate::application::config::AuthConfig;
use crate::application::token::parse_session_token;
use crate::domain::entity::UserSession;
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

/// Resolve a session cookie into a live session
///
/// Resolution is also where dead sessions get finalized: a hard-expired
/// or idle-expired record is terminated on sight, so a later listing
/// does not show it as active.
pub struct CheckSessionUseCase<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventSink>,
}

impl<R> CheckSessionUseCase<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventSink>) -> Self {
        Self {
            repo,
            config,
            events,
        }
    }

    /// Resolve and touch: on success the idle window slides forward
    ///
    /// The activity write happens in the background so a slow database
    /// does not hold up the request that already proved its session.
    pub async fn resolve(&self, token: Option<&str>) -> AuthResult<UserSession> {
        let mut session = self.resolve_without_touch(token).await?;
        session.touch();
        self.touch_in_background(session.clone());
        Ok(session)
    }

    /// Persist a slid idle window without holding up the caller
    pub fn touch_in_background(&self, mut session: UserSession) {
        session.touch();
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.update_session_activity(&session).await {
                tracing::warn!(
                    session_id = %session.session_id,
                    error = %e,
                    "failed to record session activity"
                );
            }
        });
    }

    /// Resolve without sliding the idle window; used where the caller
    /// must observe rather than extend
    pub async fn resolve_without_touch(&self, token: Option<&str>) -> AuthResult<UserSession> {
        let token = token.ok_or(AuthError::SessionInvalid)?;
        let session_uuid =
            parse_session_token(&self.config.secret, token).ok_or(AuthError::SessionInvalid)?;
        let session_id = SessionId::from_uuid(session_uuid);

        let Some(session) = self.repo.find_session(&session_id).await? else {
            return Err(AuthError::SessionInvalid);
        };

        if !session.active {
            return Err(AuthError::SessionInvalid);
        }

        if session.is_hard_expired() {
            self.repo.terminate_session(&session.session_id).await?;
            self.events.emit(AuthEvent::SessionTerminated {
                session_id: session.session_id,
            });
            return Err(AuthError::SessionInvalid);
        }

        if session.is_idle_expired() {
            self.repo.terminate_session(&session.session_id).await?;
            self.events.emit(AuthEvent::SessionIdleTimeout {
                session_id: session.session_id,
                user_id: session.user_id,
            });
            return Err(AuthError::SessionInvalid);
        }

        Ok(session)
    }
}
