//! Idle-window heartbeat with a degraded fallback

use std::sync::Arc;

use crate::application::check_session::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::entity::{ActivityStatus, DegradedSession};
use crate::domain::events::EventSink;
use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;

/// Report how much of the idle window remains
///
/// Never fails the request over an unresolvable session: when the
/// cookie is absent or dead but the client declared its last activity,
/// the report degrades to client-declared math so the UI can still
/// count down to its warning. A degraded report never validates or
/// extends anything.
pub struct PingActivityUseCase<R> {
    sessions: CheckSessionUseCase<R>,
}

impl<R> PingActivityUseCase<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventSink>) -> Self {
        Self {
            sessions: CheckSessionUseCase::new(repo, config, events),
        }
    }

    pub async fn execute(
        &self,
        session_token: Option<&str>,
        declared_last_activity_ms: Option<i64>,
    ) -> AuthResult<ActivityStatus> {
        match self.sessions.resolve_without_touch(session_token).await {
            Ok(session) => {
                // Remaining time reflects the window as it stood when the
                // ping arrived; the ping itself then counts as activity.
                let status = session.activity_status();
                self.sessions.touch_in_background(session);
                Ok(status)
            }
            Err(e) if e.kind().is_server_error() => Err(e),
            Err(_) => {
                let idle_default = AuthConfig::IDLE_TIMEOUT_DEFAULT_SECS;
                Ok(declared_last_activity_ms
                    .and_then(|ms| DegradedSession::from_declared_ms(ms, idle_default))
                    .map(|d| d.activity_status())
                    .unwrap_or_else(|| ActivityStatus::invalid(idle_default)))
            }
        }
    }
}
