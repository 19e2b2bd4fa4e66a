//! Sign-in with username and password

use std::sync::Arc;

use platform::password::ClearTextPassword;

use crate::application::config::{AuthConfig, RateLimitAction};
use crate::application::context::AuthContext;
use crate::application::issue_otp::IssueOtpUseCase;
use crate::application::mint_session::{SessionHandle, mint_session};
use crate::application::token::sign_pending_token;
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::notifier::OtpNotifier;
use crate::domain::repository::{
    ChallengeRepository, CredentialRepository, RateLimitRepository, SessionRepository,
    UserRepository,
};
use crate::domain::value_object::ChallengePurpose;
use crate::domain::entity::user::canonical_username;
use crate::error::{AuthError, AuthResult};

#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    /// Keep the session longer on this device
    pub trust_device: bool,
}

/// Outcome of a credential check
#[derive(Debug)]
pub enum LoginOutcome {
    /// Fully signed in; no second factor required
    Authenticated { session: SessionHandle },
    /// Credentials verified, a code was sent; the flow continues at the
    /// verification endpoint with the pending token
    PendingVerification {
        pending_token: String,
        expires_in_secs: u64,
    },
}

/// Verify credentials and either open a session or start the code step
pub struct LoginUseCase<R> {
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn OtpNotifier>,
}

impl<R> LoginUseCase<R>
where
    R: UserRepository
        + CredentialRepository
        + ChallengeRepository
        + SessionRepository
        + RateLimitRepository,
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

    pub async fn execute(&self, input: LoginInput, ctx: &AuthContext) -> AuthResult<LoginOutcome> {
        if input.username.trim().is_empty() || input.password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        self.enforce_rate_limit(ctx).await?;

        // Every refusal below this point reads the same to the caller so
        // error text does not reveal whether the account exists.
        let canonical = canonical_username(&input.username);
        let Some(mut user) = self.repo.find_user_by_username(&canonical).await? else {
            self.events.emit(AuthEvent::LoginFailed {
                user_id: None,
                reason: "unknown_user",
            });
            return Err(AuthError::InvalidCredentials);
        };

        if !user.can_login() {
            self.events.emit(AuthEvent::LoginFailed {
                user_id: Some(user.user_id),
                reason: "account_disabled",
            });
            return Err(AuthError::AccountDisabled);
        }

        let Some(mut credential) = self.repo.find_credential(&user.user_id).await? else {
            self.events.emit(AuthEvent::LoginFailed {
                user_id: Some(user.user_id),
                reason: "no_credential",
            });
            return Err(AuthError::InvalidCredentials);
        };

        if credential.is_locked() {
            self.events.emit(AuthEvent::LoginLockedOut {
                user_id: user.user_id,
            });
            return Err(AuthError::AccountLocked);
        }

        let password = ClearTextPassword::new(input.password)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !credential.verify_password(&password, self.config.pepper_bytes()) {
            credential.record_failure();
            let locked = credential.is_locked();
            self.repo.update_credential(&credential).await?;

            self.events.emit(AuthEvent::LoginFailed {
                user_id: Some(user.user_id),
                reason: "bad_password",
            });
            if locked {
                self.events.emit(AuthEvent::LoginLockedOut {
                    user_id: user.user_id,
                });
                return Err(AuthError::AccountLocked);
            }
            return Err(AuthError::InvalidCredentials);
        }

        if credential.login_failed_count > 0 {
            credential.reset_failures();
            self.repo.update_credential(&credential).await?;
        }

        if user.second_factor_required {
            let issuer = IssueOtpUseCase::new(
                self.repo.clone(),
                self.events.clone(),
                self.notifier.clone(),
            );
            let expires_in_secs = issuer
                .issue_for_user(&user, ChallengePurpose::Login)
                .await?;

            let pending_token = sign_pending_token(
                &self.config.secret,
                user.user_id.as_uuid(),
                ChallengePurpose::Login,
            );

            return Ok(LoginOutcome::PendingVerification {
                pending_token,
                expires_in_secs,
            });
        }

        user.record_login();
        self.repo.update_user(&user).await?;

        let session = mint_session(
            self.repo.as_ref(),
            &self.config,
            self.events.as_ref(),
            &user,
            &ctx.client,
            input.trust_device,
        )
        .await?;

        Ok(LoginOutcome::Authenticated { session })
    }

    async fn enforce_rate_limit(&self, ctx: &AuthContext) -> AuthResult<()> {
        let action = RateLimitAction::Login;
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
