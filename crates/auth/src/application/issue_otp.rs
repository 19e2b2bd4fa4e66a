//! Issue one-time verification codes

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::{PendingChallenge, User};
use crate::domain::events::{AuthEvent, EventSink};
use crate::domain::notifier::{OtpDelivery, OtpNotifier};
use crate::domain::repository::{ChallengeRepository, UserRepository};
use crate::domain::value_object::{ChallengePurpose, OtpCode};
use crate::error::AuthResult;

/// Generate, store and dispatch a one-time code
///
/// Storing replaces any live challenge for the same `(user, purpose)`,
/// so at most one code per purpose ever verifies.
pub struct IssueOtpUseCase<R> {
    repo: Arc<R>,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn OtpNotifier>,
}

impl<R> IssueOtpUseCase<R>
where
    R: ChallengeRepository + UserRepository,
{
    pub fn new(
        repo: Arc<R>,
        events: Arc<dyn EventSink>,
        notifier: Arc<dyn OtpNotifier>,
    ) -> Self {
        Self {
            repo,
            events,
            notifier,
        }
    }

    /// Issue a code for a known user; returns the validity window in
    /// seconds
    pub async fn issue_for_user(&self, user: &User, purpose: ChallengePurpose) -> AuthResult<u64> {
        let code = OtpCode::generate();
        let challenge = PendingChallenge::new(
            user.user_id,
            purpose,
            &code,
            AuthConfig::OTP_TTL_SECS,
            AuthConfig::OTP_MAX_ATTEMPTS,
        );
        // Report the configured window, not a recomputation from the row:
        // the number must match what the unknown-recipient path reports.
        let expires_in_secs = AuthConfig::OTP_TTL_SECS as u64;

        self.repo.replace_challenge(&challenge).await?;

        self.notifier.dispatch(OtpDelivery {
            email: user.email.clone(),
            username: user.username.clone(),
            code: code.as_str().to_string(),
            purpose,
            expires_in_secs,
        });

        self.events.emit(AuthEvent::ChallengeIssued {
            user_id: user.user_id,
            purpose,
        });

        Ok(expires_in_secs)
    }

    /// Issue a code addressed by email
    ///
    /// An unknown email reports the same validity window as a known one,
    /// so the response does not reveal whether the account exists.
    pub async fn issue_by_email(&self, email: &str, purpose: ChallengePurpose) -> AuthResult<u64> {
        let normalized = email.trim().to_lowercase();
        match self.repo.find_user_by_email(&normalized).await? {
            Some(user) => self.issue_for_user(&user, purpose).await,
            None => Ok(AuthConfig::OTP_TTL_SECS as u64),
        }
    }
}
