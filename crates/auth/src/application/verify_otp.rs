//! Verify a one-time code and complete sign-in

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::{AuthConfig, RateLimitAction};
use crate::application::context::AuthContext;
use crate::application::mint_session::{SessionHandle, mint_session};
use crate::application::token::parse_pending_token;
use crate::domain::entity::PendingChallenge;
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::repository::{
    ChallengeRepository, RateLimitRepository, SessionRepository, UserRepository,
};
use crate::domain::value_object::{ChallengePurpose, OtpCode};
use crate::error::{AuthError, AuthResult};

#[derive(Debug)]
pub struct VerifyOtpInput {
    pub code: String,
    pub trust_device: bool,
}

/// Check a submitted code against the pending challenge and open the
/// session on success
pub struct VerifyOtpUseCase<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventSink>,
}

impl<R> VerifyOtpUseCase<R>
where
    R: UserRepository + ChallengeRepository + SessionRepository + RateLimitRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventSink>) -> Self {
        Self {
            repo,
            config,
            events,
        }
    }

    pub async fn execute(
        &self,
        input: VerifyOtpInput,
        ctx: &AuthContext,
    ) -> AuthResult<SessionHandle> {
        self.enforce_rate_limit(ctx).await?;

        let (user_id, purpose) = self.pending_identity(ctx)?;

        // Format check first; a malformed submission never consumes an
        // attempt.
        let code =
            OtpCode::parse(&input.code).map_err(|_| AuthError::BadOtpFormat {
                expected_len: crate::domain::value_object::OTP_CODE_LENGTH,
            })?;

        let Some(mut challenge) = self.repo.find_challenge(&user_id, purpose).await? else {
            return Err(AuthError::ChallengeNotFound);
        };

        if challenge.used || challenge.attempts_remaining <= 0 {
            // Torn-down state that has not been cleaned up yet
            self.repo.delete_challenge(&user_id, purpose).await?;
            return Err(AuthError::ChallengeNotFound);
        }

        if challenge.is_expired() {
            self.repo.delete_challenge(&user_id, purpose).await?;
            self.events.emit(AuthEvent::ChallengeExpired { user_id, purpose });
            return Err(AuthError::ChallengeExpired);
        }

        if !challenge.code_matches(&code) {
            return self.handle_mismatch(challenge, user_id, purpose).await;
        }

        // The used flag flips before deletion so a concurrent verify of
        // the same code cannot succeed twice.
        challenge.mark_used();
        self.repo.update_challenge(&challenge).await?;
        self.repo.delete_challenge(&user_id, purpose).await?;

        let Some(mut user) = self.repo.find_user_by_id(&user_id).await? else {
            return Err(AuthError::Internal(
                "challenge refers to a missing user".to_string(),
            ));
        };

        user.record_login();
        self.repo.update_user(&user).await?;

        mint_session(
            self.repo.as_ref(),
            &self.config,
            self.events.as_ref(),
            &user,
            &ctx.client,
            input.trust_device,
        )
        .await
    }

    fn pending_identity(&self, ctx: &AuthContext) -> AuthResult<(UserId, ChallengePurpose)> {
        let token = ctx
            .pending_token
            .as_deref()
            .ok_or(AuthError::PendingLoginMissing)?;
        let (user_uuid, purpose) = parse_pending_token(&self.config.secret, token)
            .ok_or(AuthError::PendingLoginMissing)?;
        Ok((UserId::from_uuid(user_uuid), purpose))
    }

    async fn handle_mismatch(
        &self,
        mut challenge: PendingChallenge,
        user_id: UserId,
        purpose: ChallengePurpose,
    ) -> AuthResult<SessionHandle> {
        let remaining_attempts = challenge.record_mismatch();

        if remaining_attempts == 0 {
            self.repo.delete_challenge(&user_id, purpose).await?;
        } else {
            self.repo.update_challenge(&challenge).await?;
        }

        self.events.emit(AuthEvent::ChallengeFailed {
            user_id,
            purpose,
            remaining_attempts,
        });

        Err(AuthError::InvalidOtp { remaining_attempts })
    }

    async fn enforce_rate_limit(&self, ctx: &AuthContext) -> AuthResult<()> {
        let action = RateLimitAction::VerifyOtp;
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
