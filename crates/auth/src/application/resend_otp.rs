//! Re-send the pending verification code

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::{AuthConfig, RateLimitAction};
use crate::application::context::AuthContext;
use crate::application::issue_otp::IssueOtpUseCase;
use crate::application::token::parse_pending_token;
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::notifier::OtpNotifier;
use crate::domain::repository::{ChallengeRepository, RateLimitRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

/// Replace the pending challenge with a fresh code
///
/// The previous code stops verifying the moment the new one is stored.
pub struct ResendOtpUseCase<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn OtpNotifier>,
}

impl<R> ResendOtpUseCase<R>
where
    R: UserRepository + ChallengeRepository + RateLimitRepository,
{
    pub fn new(
        repo: Arc<R>,
        config: Arc<AuthConfig>,
        events: Arc<dyn EventSink>,
        notifier: Arc<dyn OtpNotifier>,
    ) -> Self {
        Self {
            repo,
            config,
            events,
            notifier,
        }
    }

    /// Returns the validity window of the new code in seconds
    pub async fn execute(&self, ctx: &AuthContext) -> AuthResult<u64> {
        self.enforce_rate_limit(ctx).await?;

        let token = ctx
            .pending_token
            .as_deref()
            .ok_or(AuthError::PendingLoginMissing)?;
        let (user_uuid, purpose) = parse_pending_token(&self.config.secret, token)
            .ok_or(AuthError::PendingLoginMissing)?;
        let user_id = UserId::from_uuid(user_uuid);

        let Some(user) = self.repo.find_user_by_id(&user_id).await? else {
            return Err(AuthError::PendingLoginMissing);
        };

        let issuer = IssueOtpUseCase::new(
            self.repo.clone(),
            self.events.clone(),
            self.notifier.clone(),
        );
        issuer.issue_for_user(&user, purpose).await
    }

    async fn enforce_rate_limit(&self, ctx: &AuthContext) -> AuthResult<()> {
        let action = RateLimitAction::ResendOtp;
        let key = ctx.rate_limit_key();
        let decision = self
            .repo
            .record_hit(action.as_str(), &key, &self.config.rate_limit(action))
            .await?;

        if !decision.allowed {
            self.events.emit(AuthEvent::RateLimited {
                action: action.as_str(),
                client_key: key,
            });
            return Err(AuthError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            });
        }
        Ok(())
    }
}
