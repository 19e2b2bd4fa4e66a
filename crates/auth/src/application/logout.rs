//! Session termination flows

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use kernel::id::SessionId;

use crate::application::config::AuthConfig;
use crate::application::token::parse_session_token;
use crate::domain::entity::UserSession;
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

/// Terminate sessions: the caller's own, one by id, all others, or all
///
/// The targeted flavors take the already-resolved caller session, so a
/// handler that resolved it for CSRF does not pay a second lookup.
pub struct LogoutUseCase<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventSink>,
}

impl<R> LogoutUseCase<R>
where
    R: SessionRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventSink>) -> Self {
        Self {
            repo,
            config,
            events,
        }
    }

    /// Destroy the caller's session; succeeds even when the cookie is
    /// already dead, since the caller's goal is a signed-out state
    pub async fn execute(&self, session_token: Option<&str>) -> AuthResult<()> {
        let Some(token) = session_token else {
            return Ok(());
        };
        let Some(session_uuid) = parse_session_token(&self.config.secret, token) else {
            return Ok(());
        };

        let session_id = SessionId::from_uuid(session_uuid);
        self.repo.terminate_session(&session_id).await?;
        self.events
            .emit(AuthEvent::SessionTerminated { session_id });
        Ok(())
    }

    /// Terminate one of the caller's other sessions by id
    pub async fn execute_one(&self, caller: &UserSession, target: Uuid) -> AuthResult<()> {
        let target_id = SessionId::from_uuid(target);
        let owned = self
            .repo
            .terminate_owned_session(&target_id, &caller.user_id)
            .await?;
        if !owned {
            return Err(AuthError::SessionNotFound);
        }

        self.events
            .emit(AuthEvent::SessionTerminated { session_id: target_id });
        Ok(())
    }

    /// Terminate every session of the caller except the current one;
    /// returns how many were terminated
    pub async fn execute_all_others(&self, caller: &UserSession) -> AuthResult<u64> {
        // Sessions created after this point belong to a newer sign-in and
        // are not swept up.
        let cutoff = Utc::now();
        let count = self
            .repo
            .terminate_user_sessions(&caller.user_id, Some(&caller.session_id), cutoff)
            .await?;

        self.events.emit(AuthEvent::SessionsTerminated {
            user_id: caller.user_id,
            count,
        });
        Ok(count)
    }

    /// Terminate every session of the caller, the current one included
    pub async fn execute_everywhere(&self, caller: &UserSession) -> AuthResult<u64> {
        let cutoff = Utc::now();
        let count = self
            .repo
            .terminate_user_sessions(&caller.user_id, None, cutoff)
            .await?;

        self.events.emit(AuthEvent::SessionsTerminated {
            user_id: caller.user_id,
            count,
        });
        Ok(count)
    }
}
