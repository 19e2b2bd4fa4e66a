//! Flow tests over an in-memory store
//!
//! The store implements the repository traits with plain maps so the
//! sign-in, verification and session flows run end to end without a
//! database.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use kernel::id::{SessionId, UserId};
use platform::client::ClientInfo;
use platform::password::ClearTextPassword;
use platform::rate_limit::{RateLimitConfig, RateLimitDecision};

use crate::application::activity::PingActivityUseCase;
use crate::application::check_session::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::application::context::AuthContext;
use crate::application::issue_otp::IssueOtpUseCase;
use crate::application::login::{LoginInput, LoginOutcome, LoginUseCase};
use crate::application::logout::LogoutUseCase;
use crate::application::sessions::ListSessionsUseCase;
use crate::application::verify_otp::{VerifyOtpInput, VerifyOtpUseCase};
use crate::domain::entity::{Credential, PendingChallenge, User, UserSession};
use crate::domain::events::NullEventSink;
use crate::domain::notifier::{OtpDelivery, OtpNotifier};
use crate::domain::repository::{
    ChallengeRepository, CredentialRepository, MaintenanceRepository, RateLimitRepository,
    SessionRepository, UserRepository,
};
use crate::domain::value_object::{AccountStatus, ChallengePurpose};
use crate::error::{AuthError, AuthResult};

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
struct StoreState {
    users: HashMap<uuid::Uuid, User>,
    credentials: HashMap<uuid::Uuid, Credential>,
    challenges: HashMap<(uuid::Uuid, i16), PendingChallenge>,
    sessions: HashMap<uuid::Uuid, UserSession>,
    rate_windows: HashMap<(String, String), (i64, u32)>,
}

#[derive(Clone, Default)]
struct InMemoryStore(Arc<Mutex<StoreState>>);

impl InMemoryStore {
    fn with_session<F: FnOnce(&mut UserSession)>(&self, session_id: &SessionId, f: F) {
        let mut state = self.0.lock().unwrap();
        let session = state.sessions.get_mut(session_id.as_uuid()).unwrap();
        f(session);
    }

    fn with_challenge<F: FnOnce(&mut PendingChallenge)>(
        &self,
        user_id: &UserId,
        purpose: ChallengePurpose,
        f: F,
    ) {
        let mut state = self.0.lock().unwrap();
        let challenge = state
            .challenges
            .get_mut(&(*user_id.as_uuid(), purpose.as_i16()))
            .unwrap();
        f(challenge);
    }
}

impl UserRepository for InMemoryStore {
    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.0.lock().unwrap().users.get(user_id.as_uuid()).cloned())
    }

    async fn find_user_by_username(&self, canonical: &str) -> AuthResult<Option<User>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username.to_lowercase() == canonical)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email.as_deref().is_some_and(|e| e.to_lowercase() == email))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        self.0
            .lock()
            .unwrap()
            .users
            .insert(*user.user_id.as_uuid(), user.clone());
        Ok(())
    }
}

impl CredentialRepository for InMemoryStore {
    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .credentials
            .get(user_id.as_uuid())
            .cloned())
    }

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()> {
        self.0
            .lock()
            .unwrap()
            .credentials
            .insert(*credential.user_id.as_uuid(), credential.clone());
        Ok(())
    }
}

impl ChallengeRepository for InMemoryStore {
    async fn replace_challenge(&self, challenge: &PendingChallenge) -> AuthResult<()> {
        self.0.lock().unwrap().challenges.insert(
            (*challenge.user_id.as_uuid(), challenge.purpose.as_i16()),
            challenge.clone(),
        );
        Ok(())
    }

    async fn find_challenge(
        &self,
        user_id: &UserId,
        purpose: ChallengePurpose,
    ) -> AuthResult<Option<PendingChallenge>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .challenges
            .get(&(*user_id.as_uuid(), purpose.as_i16()))
            .cloned())
    }

    async fn update_challenge(&self, challenge: &PendingChallenge) -> AuthResult<()> {
        self.0.lock().unwrap().challenges.insert(
            (*challenge.user_id.as_uuid(), challenge.purpose.as_i16()),
            challenge.clone(),
        );
        Ok(())
    }

    async fn delete_challenge(
        &self,
        user_id: &UserId,
        purpose: ChallengePurpose,
    ) -> AuthResult<()> {
        self.0
            .lock()
            .unwrap()
            .challenges
            .remove(&(*user_id.as_uuid(), purpose.as_i16()));
        Ok(())
    }
}

impl SessionRepository for InMemoryStore {
    async fn create_session(&self, session: &UserSession) -> AuthResult<()> {
        self.0
            .lock()
            .unwrap()
            .sessions
            .insert(*session.session_id.as_uuid(), session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<UserSession>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .sessions
            .get(session_id.as_uuid())
            .cloned())
    }

    async fn update_session_activity(&self, session: &UserSession) -> AuthResult<()> {
        let mut state = self.0.lock().unwrap();
        if let Some(stored) = state.sessions.get_mut(session.session_id.as_uuid()) {
            if stored.active {
                stored.last_activity_at = session.last_activity_at;
                stored.expires_at_ms = session.expires_at_ms;
            }
        }
        Ok(())
    }

    async fn list_active_sessions(&self, user_id: &UserId) -> AuthResult<Vec<UserSession>> {
        let now_ms = Utc::now().timestamp_millis();
        let mut sessions: Vec<UserSession> = self
            .0
            .lock()
            .unwrap()
            .sessions
            .values()
            .filter(|s| s.user_id == *user_id && s.active && s.expires_at_ms > now_ms)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(sessions)
    }

    async fn terminate_session(&self, session_id: &SessionId) -> AuthResult<()> {
        if let Some(s) = self
            .0
            .lock()
            .unwrap()
            .sessions
            .get_mut(session_id.as_uuid())
        {
            s.active = false;
        }
        Ok(())
    }

    async fn terminate_owned_session(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> AuthResult<bool> {
        let mut state = self.0.lock().unwrap();
        match state.sessions.get_mut(session_id.as_uuid()) {
            Some(s) if s.user_id == *user_id => {
                s.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn terminate_user_sessions(
        &self,
        user_id: &UserId,
        spare: Option<&SessionId>,
        created_before: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut count = 0;
        for session in self.0.lock().unwrap().sessions.values_mut() {
            if session.user_id == *user_id
                && session.active
                && session.created_at <= created_before
                && spare.is_none_or(|s| session.session_id != *s)
            {
                session.active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

impl RateLimitRepository for InMemoryStore {
    async fn record_hit(
        &self,
        action: &str,
        client_key: &str,
        config: &RateLimitConfig,
    ) -> AuthResult<RateLimitDecision> {
        let now_ms = Utc::now().timestamp_millis();
        let mut state = self.0.lock().unwrap();
        let entry = state
            .rate_windows
            .entry((action.to_string(), client_key.to_string()))
            .or_insert((now_ms, 0));
        if entry.0 <= now_ms - config.window_ms() {
            *entry = (now_ms, 0);
        }
        entry.1 += 1;
        Ok(RateLimitDecision::evaluate(config, entry.1, entry.0, now_ms))
    }
}

impl MaintenanceRepository for InMemoryStore {
    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let mut state = self.0.lock().unwrap();
        let before = state.challenges.len() + state.sessions.len();
        state.challenges.retain(|_, c| c.expires_at > now);
        state
            .sessions
            .retain(|_, s| s.expires_at_ms > now.timestamp_millis());
        Ok((before - state.challenges.len() - state.sessions.len()) as u64)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct CaptureNotifier(Mutex<Vec<OtpDelivery>>);

impl CaptureNotifier {
    fn last_code(&self) -> String {
        self.0.lock().unwrap().last().expect("no code sent").code.clone()
    }

    fn sent_count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl OtpNotifier for CaptureNotifier {
    fn dispatch(&self, delivery: OtpDelivery) {
        self.0.lock().unwrap().push(delivery);
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    config: Arc<AuthConfig>,
    notifier: Arc<CaptureNotifier>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::default()),
            config: Arc::new(AuthConfig::development()),
            notifier: Arc::new(CaptureNotifier::default()),
        }
    }

    async fn seed_user(&self, username: &str, password: &str, second_factor: bool) -> UserId {
        let now = Utc::now();
        let user = User {
            user_id: UserId::new(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            status: AccountStatus::Active,
            second_factor_required: second_factor,
            idle_timeout_secs: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let hash = ClearTextPassword::new(password.to_string())
            .unwrap()
            .hash(None)
            .unwrap();
        let credential = Credential {
            user_id: user.user_id,
            password_hash: hash,
            login_failed_count: 0,
            last_failed_at: None,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        let user_id = user.user_id;
        self.store.update_user(&user).await.unwrap();
        self.store.update_credential(&credential).await.unwrap();
        user_id
    }

    fn ctx(&self, ip: &str) -> AuthContext {
        AuthContext {
            client: ClientInfo::new(
                Some(ip.parse::<IpAddr>().unwrap()),
                Some("TestAgent/1.0".to_string()),
            ),
            session_token: None,
            pending_token: None,
            csrf_header: None,
        }
    }

    fn login_use_case(&self) -> LoginUseCase<InMemoryStore> {
        LoginUseCase::new(
            self.store.clone(),
            self.config.clone(),
            Arc::new(NullEventSink),
            self.notifier.clone(),
        )
    }

    fn verify_use_case(&self) -> VerifyOtpUseCase<InMemoryStore> {
        VerifyOtpUseCase::new(
            self.store.clone(),
            self.config.clone(),
            Arc::new(NullEventSink),
        )
    }

    fn checker(&self) -> CheckSessionUseCase<InMemoryStore> {
        CheckSessionUseCase::new(
            self.store.clone(),
            self.config.clone(),
            Arc::new(NullEventSink),
        )
    }

    fn logout_use_case(&self) -> LogoutUseCase<InMemoryStore> {
        LogoutUseCase::new(
            self.store.clone(),
            self.config.clone(),
            Arc::new(NullEventSink),
        )
    }

    async fn login(&self, username: &str, password: &str, ip: &str) -> AuthResult<LoginOutcome> {
        self.login_use_case()
            .execute(
                LoginInput {
                    username: username.to_string(),
                    password: password.to_string(),
                    trust_device: false,
                },
                &self.ctx(ip),
            )
            .await
    }

    /// Sign in up to the pending stage and return the pending token
    async fn login_to_pending(&self, username: &str, password: &str, ip: &str) -> String {
        match self.login(username, password, ip).await.unwrap() {
            LoginOutcome::PendingVerification { pending_token, .. } => pending_token,
            other => panic!("expected pending verification, got {other:?}"),
        }
    }

    async fn verify(
        &self,
        pending_token: &str,
        code: &str,
        ip: &str,
    ) -> AuthResult<crate::application::mint_session::SessionHandle> {
        let mut ctx = self.ctx(ip);
        ctx.pending_token = Some(pending_token.to_string());
        self.verify_use_case()
            .execute(
                VerifyOtpInput {
                    code: code.to_string(),
                    trust_device: false,
                },
                &ctx,
            )
            .await
    }
}

// ============================================================================
// Sign-in
// ============================================================================

#[tokio::test]
async fn test_login_without_second_factor_opens_session() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    let outcome = h.login("carol", "correct horse battery", "10.0.0.1").await.unwrap();
    let LoginOutcome::Authenticated { session } = outcome else {
        panic!("expected direct authentication");
    };

    let resolved = h.checker().resolve(Some(&session.token)).await.unwrap();
    assert!(resolved.is_valid());
    assert_eq!(resolved.idle_timeout_secs, 1800);
    assert_eq!(h.notifier.sent_count(), 0);
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_username() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    let outcome = h.login("  CAROL ", "correct horse battery", "10.0.0.2").await;
    assert!(matches!(outcome, Ok(LoginOutcome::Authenticated { .. })));
}

#[tokio::test]
async fn test_login_missing_fields() {
    let h = Harness::new();
    let err = h.login("", "secret", "10.0.0.3").await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials));

    let err = h.login("carol", "   ", "10.0.0.3").await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials));
}

#[tokio::test]
async fn test_unknown_user_and_bad_password_read_identically() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    let unknown = h.login("mallory", "whatever", "10.0.0.4").await.unwrap_err();
    let wrong = h.login("carol", "wrong password", "10.0.0.5").await.unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    for i in 0..4 {
        let err = h
            .login("carol", "wrong password", &format!("10.0.1.{i}"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
    // Fifth failure crosses the threshold
    let err = h.login("carol", "wrong password", "10.0.1.4").await.unwrap_err();
    assert!(matches!(err, AuthError::AccountLocked));

    // The right password is refused while locked
    let err = h
        .login("carol", "correct horse battery", "10.0.1.5")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountLocked));
}

#[tokio::test]
async fn test_disabled_account_is_refused() {
    let h = Harness::new();
    let user_id = h.seed_user("carol", "correct horse battery", false).await;
    {
        let mut state = h.store.0.lock().unwrap();
        state.users.get_mut(user_id.as_uuid()).unwrap().status = AccountStatus::Disabled;
    }

    let err = h
        .login("carol", "correct horse battery", "10.0.0.6")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountDisabled));
}

#[tokio::test]
async fn test_login_rate_limit_refuses_sixth_attempt() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    // Same client IP for every attempt
    for _ in 0..5 {
        let _ = h.login("carol", "wrong password", "10.0.2.1").await;
    }
    let err = h.login("carol", "wrong password", "10.0.2.1").await.unwrap_err();
    match err {
        AuthError::RateLimited { retry_after_secs } => assert!(retry_after_secs >= 1),
        other => panic!("expected rate limit, got {other:?}"),
    }
}

// ============================================================================
// Second factor
// ============================================================================

#[tokio::test]
async fn test_full_two_factor_flow() {
    let h = Harness::new();
    h.seed_user("alice", "correct horse battery", true).await;

    let pending = h.login_to_pending("alice", "correct horse battery", "10.0.3.1").await;
    assert_eq!(h.notifier.sent_count(), 1);
    let code = h.notifier.last_code();

    // Wrong code first: one attempt consumed
    let err = h.verify(&pending, "000000", "10.0.3.1").await.unwrap_err();
    match err {
        AuthError::InvalidOtp { remaining_attempts } => assert_eq!(remaining_attempts, 4),
        other => panic!("expected invalid code, got {other:?}"),
    }

    // Correct code opens a session
    let session = h.verify(&pending, &code, "10.0.3.1").await.unwrap();
    let resolved = h.checker().resolve(Some(&session.token)).await.unwrap();
    assert!(resolved.is_valid());

    // The challenge is gone; the same code cannot be replayed
    let err = h.verify(&pending, &code, "10.0.3.1").await.unwrap_err();
    assert!(matches!(err, AuthError::ChallengeNotFound));
}

#[tokio::test]
async fn test_malformed_code_does_not_consume_attempts() {
    let h = Harness::new();
    let user_id = h.seed_user("alice", "correct horse battery", true).await;
    let pending = h.login_to_pending("alice", "correct horse battery", "10.0.3.2").await;

    let err = h.verify(&pending, "12345", "10.0.3.2").await.unwrap_err();
    assert!(matches!(err, AuthError::BadOtpFormat { expected_len: 6 }));

    let challenge = h
        .store
        .find_challenge(&user_id, ChallengePurpose::Login)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(challenge.attempts_remaining, 5);
}

#[tokio::test]
async fn test_attempts_exhaust_and_challenge_is_torn_down() {
    let h = Harness::new();
    h.seed_user("alice", "correct horse battery", true).await;
    let pending = h.login_to_pending("alice", "correct horse battery", "10.0.3.3").await;
    let code = h.notifier.last_code();

    for expected_remaining in (0..5).rev() {
        let err = h.verify(&pending, "999999", "10.0.3.3").await.unwrap_err();
        match err {
            AuthError::InvalidOtp { remaining_attempts } => {
                assert_eq!(remaining_attempts, expected_remaining)
            }
            other => panic!("expected invalid code, got {other:?}"),
        }
    }

    // Challenge deleted; even the correct code now reports it gone
    let err = h.verify(&pending, &code, "10.0.3.3").await.unwrap_err();
    assert!(matches!(err, AuthError::ChallengeNotFound));
}

#[tokio::test]
async fn test_reissue_invalidates_previous_code() {
    let h = Harness::new();
    h.seed_user("alice", "correct horse battery", true).await;

    let pending = h.login_to_pending("alice", "correct horse battery", "10.0.3.4").await;
    let first_code = h.notifier.last_code();

    // A second sign-in replaces the challenge
    let pending2 = h.login_to_pending("alice", "correct horse battery", "10.0.3.5").await;
    let second_code = h.notifier.last_code();
    assert_eq!(h.notifier.sent_count(), 2);

    if first_code != second_code {
        let err = h.verify(&pending, &first_code, "10.0.3.4").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOtp { .. }));
    }
    assert!(h.verify(&pending2, &second_code, "10.0.3.5").await.is_ok());
}

#[tokio::test]
async fn test_expired_challenge() {
    let h = Harness::new();
    let user_id = h.seed_user("alice", "correct horse battery", true).await;
    let pending = h.login_to_pending("alice", "correct horse battery", "10.0.3.6").await;
    let code = h.notifier.last_code();

    h.store.with_challenge(&user_id, ChallengePurpose::Login, |c| {
        c.expires_at = Utc::now() - Duration::seconds(1);
    });

    let err = h.verify(&pending, &code, "10.0.3.6").await.unwrap_err();
    assert!(matches!(err, AuthError::ChallengeExpired));

    // Torn down on sight
    let gone = h
        .store
        .find_challenge(&user_id, ChallengePurpose::Login)
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn test_verify_without_pending_token() {
    let h = Harness::new();
    let err = h
        .verify_use_case()
        .execute(
            VerifyOtpInput {
                code: "123456".to_string(),
                trust_device: false,
            },
            &h.ctx("10.0.3.7"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::PendingLoginMissing));
}

#[tokio::test]
async fn test_trusted_device_gets_longer_session() {
    let h = Harness::new();
    h.seed_user("alice", "correct horse battery", true).await;
    let pending = h.login_to_pending("alice", "correct horse battery", "10.0.3.8").await;
    let code = h.notifier.last_code();

    let mut ctx = h.ctx("10.0.3.8");
    ctx.pending_token = Some(pending);
    let session = h
        .verify_use_case()
        .execute(
            VerifyOtpInput {
                code,
                trust_device: true,
            },
            &ctx,
        )
        .await
        .unwrap();

    let week_ms = 7 * 24 * 3600 * 1000;
    let day_ms = 24 * 3600 * 1000;
    assert!(session.expires_at_ms > Utc::now().timestamp_millis() + week_ms - day_ms);
}

// ============================================================================
// Code issuance by email
// ============================================================================

#[tokio::test]
async fn test_reset_code_issues_for_known_email() {
    let h = Harness::new();
    let user_id = h.seed_user("alice", "correct horse battery", true).await;

    let issuer =
        IssueOtpUseCase::new(h.store.clone(), Arc::new(NullEventSink), h.notifier.clone());
    let expires_in = issuer
        .issue_by_email("  ALICE@example.com ", ChallengePurpose::PasswordReset)
        .await
        .unwrap();
    assert_eq!(expires_in, AuthConfig::OTP_TTL_SECS as u64);
    assert_eq!(h.notifier.sent_count(), 1);

    let challenge = h
        .store
        .find_challenge(&user_id, ChallengePurpose::PasswordReset)
        .await
        .unwrap();
    assert!(challenge.is_some());

    // The login purpose is its own slot and stays empty
    let login = h
        .store
        .find_challenge(&user_id, ChallengePurpose::Login)
        .await
        .unwrap();
    assert!(login.is_none());
}

#[tokio::test]
async fn test_unknown_email_reports_the_same_window_without_a_challenge() {
    let h = Harness::new();
    h.seed_user("alice", "correct horse battery", true).await;

    let issuer =
        IssueOtpUseCase::new(h.store.clone(), Arc::new(NullEventSink), h.notifier.clone());
    let known = issuer
        .issue_by_email("alice@example.com", ChallengePurpose::PasswordReset)
        .await
        .unwrap();
    let unknown = issuer
        .issue_by_email("mallory@example.com", ChallengePurpose::PasswordReset)
        .await
        .unwrap();

    // The response reads identically either way
    assert_eq!(unknown, known);

    // But only the known address got a code and a stored challenge
    assert_eq!(h.notifier.sent_count(), 1);
    let state = h.store.0.lock().unwrap();
    assert_eq!(state.challenges.len(), 1);
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_idle_timeout_terminates_on_resolve() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;
    let LoginOutcome::Authenticated { session } =
        h.login("carol", "correct horse battery", "10.0.4.1").await.unwrap()
    else {
        panic!("expected direct authentication");
    };

    h.store.with_session(&session.session_id, |s| {
        s.last_activity_at = Utc::now() - Duration::seconds(1801);
    });

    let err = h.checker().resolve(Some(&session.token)).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionInvalid));

    // The record was finalized, not just refused
    let stored = h.store.find_session(&session.session_id).await.unwrap().unwrap();
    assert!(!stored.active);
}

#[tokio::test]
async fn test_per_user_idle_preference_is_clamped() {
    let h = Harness::new();
    let user_id = h.seed_user("carol", "correct horse battery", false).await;
    {
        let mut state = h.store.0.lock().unwrap();
        state.users.get_mut(user_id.as_uuid()).unwrap().idle_timeout_secs = Some(60);
    }

    let LoginOutcome::Authenticated { session } =
        h.login("carol", "correct horse battery", "10.0.4.2").await.unwrap()
    else {
        panic!("expected direct authentication");
    };
    let stored = h.store.find_session(&session.session_id).await.unwrap().unwrap();
    assert_eq!(stored.idle_timeout_secs, 300);
}

#[tokio::test]
async fn test_tampered_session_token_is_refused() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;
    let LoginOutcome::Authenticated { session } =
        h.login("carol", "correct horse battery", "10.0.4.3").await.unwrap()
    else {
        panic!("expected direct authentication");
    };

    let mut forged = session.token.clone();
    forged.truncate(forged.len() - 2);
    let err = h.checker().resolve(Some(&forged)).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionInvalid));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;
    let LoginOutcome::Authenticated { session } =
        h.login("carol", "correct horse battery", "10.0.4.4").await.unwrap()
    else {
        panic!("expected direct authentication");
    };

    h.logout_use_case().execute(Some(&session.token)).await.unwrap();
    let err = h.checker().resolve(Some(&session.token)).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionInvalid));

    // Logging out again, or with no cookie at all, still succeeds
    h.logout_use_case().execute(Some(&session.token)).await.unwrap();
    h.logout_use_case().execute(None).await.unwrap();
}

#[tokio::test]
async fn test_logout_all_spares_the_caller() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    let mut tokens = Vec::new();
    for i in 0..3 {
        let LoginOutcome::Authenticated { session } = h
            .login("carol", "correct horse battery", &format!("10.0.5.{i}"))
            .await
            .unwrap()
        else {
            panic!("expected direct authentication");
        };
        tokens.push(session.token);
    }

    let caller = h
        .checker()
        .resolve_without_touch(Some(&tokens[2]))
        .await
        .unwrap();
    let count = h.logout_use_case().execute_all_others(&caller).await.unwrap();
    assert_eq!(count, 2);

    assert!(h.checker().resolve(Some(&tokens[2])).await.is_ok());
    assert!(h.checker().resolve(Some(&tokens[0])).await.is_err());
    assert!(h.checker().resolve(Some(&tokens[1])).await.is_err());
}

#[tokio::test]
async fn test_logout_everywhere_includes_the_caller() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    let mut tokens = Vec::new();
    for i in 0..2 {
        let LoginOutcome::Authenticated { session } = h
            .login("carol", "correct horse battery", &format!("10.0.6.{i}"))
            .await
            .unwrap()
        else {
            panic!("expected direct authentication");
        };
        tokens.push(session.token);
    }

    let caller = h
        .checker()
        .resolve_without_touch(Some(&tokens[1]))
        .await
        .unwrap();
    let count = h.logout_use_case().execute_everywhere(&caller).await.unwrap();
    assert_eq!(count, 2);
    assert!(h.checker().resolve(Some(&tokens[1])).await.is_err());
}

#[tokio::test]
async fn test_terminate_foreign_session_is_refused() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;
    h.seed_user("dave", "another horse battery", false).await;

    let LoginOutcome::Authenticated { session: carol_session } =
        h.login("carol", "correct horse battery", "10.0.7.1").await.unwrap()
    else {
        panic!("expected direct authentication");
    };
    let LoginOutcome::Authenticated { session: dave_session } =
        h.login("dave", "another horse battery", "10.0.7.2").await.unwrap()
    else {
        panic!("expected direct authentication");
    };

    let caller = h
        .checker()
        .resolve_without_touch(Some(&carol_session.token))
        .await
        .unwrap();
    let err = h
        .logout_use_case()
        .execute_one(&caller, *dave_session.session_id.as_uuid())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));

    // Dave's session is untouched
    assert!(h.checker().resolve(Some(&dave_session.token)).await.is_ok());
}

#[tokio::test]
async fn test_list_sessions_marks_current() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;

    let mut tokens = Vec::new();
    for i in 0..2 {
        let LoginOutcome::Authenticated { session } = h
            .login("carol", "correct horse battery", &format!("10.0.8.{i}"))
            .await
            .unwrap()
        else {
            panic!("expected direct authentication");
        };
        tokens.push(session.token);
    }

    let listing = ListSessionsUseCase::new(
        h.store.clone(),
        h.config.clone(),
        Arc::new(NullEventSink),
    );
    let sessions = listing.execute(Some(&tokens[1])).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().filter(|s| s.is_current).count(), 1);
}

// ============================================================================
// Activity heartbeat
// ============================================================================

#[tokio::test]
async fn test_activity_ping_reports_remaining_window() {
    let h = Harness::new();
    h.seed_user("carol", "correct horse battery", false).await;
    let LoginOutcome::Authenticated { session } =
        h.login("carol", "correct horse battery", "10.0.9.1").await.unwrap()
    else {
        panic!("expected direct authentication");
    };

    h.store.with_session(&session.session_id, |s| {
        s.last_activity_at = Utc::now() - Duration::seconds(1000);
    });

    let ping = PingActivityUseCase::new(
        h.store.clone(),
        h.config.clone(),
        Arc::new(NullEventSink),
    );
    let status = ping.execute(Some(&session.token), None).await.unwrap();
    assert!(status.session_valid);
    assert!(!status.degraded);
    assert!((799..=800).contains(&status.remaining_secs));
    assert_eq!(status.idle_timeout_secs, 1800);
}

#[tokio::test]
async fn test_activity_ping_degrades_without_a_session() {
    let h = Harness::new();
    let ping = PingActivityUseCase::new(
        h.store.clone(),
        h.config.clone(),
        Arc::new(NullEventSink),
    );

    let declared = (Utc::now() - Duration::seconds(600)).timestamp_millis();
    let status = ping.execute(None, Some(declared)).await.unwrap();
    assert!(!status.session_valid);
    assert!(status.degraded);
    assert!((1199..=1200).contains(&status.remaining_secs));

    // No token and no declaration: invalid, not degraded
    let status = ping.execute(None, None).await.unwrap();
    assert!(!status.session_valid);
    assert!(!status.degraded);
    assert_eq!(status.remaining_secs, 0);
}
