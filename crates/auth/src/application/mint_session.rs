//! Session creation shared by the sign-in paths

use kernel::id::SessionId;
use platform::client::ClientInfo;

use crate::application::config::AuthConfig;
use crate::application::token::sign_session_token;
use crate::domain::entity::{User, UserSession};
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;

/// A freshly created session, ready to be set as a cookie
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: SessionId,
    /// Signed cookie value
    pub token: String,
    pub expires_at_ms: i64,
    /// Cookie Max-Age
    pub lifetime_secs: i64,
}

/// Create and persist a session for a user who just authenticated
///
/// Used by both the single-factor path and the code-verification path so
/// idle-timeout resolution and token signing stay in one place.
pub async fn mint_session<S>(
    sessions: &S,
    config: &AuthConfig,
    events: &dyn EventSink,
    user: &User,
    client: &ClientInfo,
    trusted: bool,
) -> AuthResult<SessionHandle>
where
    S: SessionRepository,
{
    let lifetime_secs = config.session_lifetime_secs(trusted);
    let idle_timeout_secs = config.effective_idle_timeout_secs(user.idle_timeout_secs);

    let session = UserSession::new(
        user.user_id,
        client.device(),
        client.ip_string(),
        trusted,
        lifetime_secs,
        idle_timeout_secs,
    );
    sessions.create_session(&session).await?;

    events.emit(AuthEvent::SessionCreated {
        session_id: session.session_id,
        user_id: user.user_id,
        trusted,
    });

    Ok(SessionHandle {
        session_id: session.session_id,
        token: sign_session_token(&config.secret, session.session_id.as_uuid()),
        expires_at_ms: session.expires_at_ms,
        lifetime_secs,
    })
}
