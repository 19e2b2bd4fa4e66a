//! Postgres-backed authentication storage

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use kernel::id::{ChallengeId, SessionId, UserId};
use platform::password::HashedPassword;
use platform::rate_limit::{RateLimitConfig, RateLimitDecision};

use crate::domain::entity::{Credential, PendingChallenge, User, UserSession};
use crate::domain::repository::{
    ChallengeRepository, CredentialRepository, MaintenanceRepository, RateLimitRepository,
    SessionRepository, UserRepository,
};
use crate::domain::value_object::{AccountStatus, ChallengePurpose};
use crate::error::{AuthError, AuthResult};

/// All repository traits over one connection pool
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    username: String,
    email: Option<String>,
    account_status: i16,
    second_factor_required: bool,
    idle_timeout_secs: Option<i32>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_entity(self) -> User {
        User {
            user_id: UserId::from_uuid(self.user_id),
            username: self.username,
            email: self.email,
            status: AccountStatus::from_i16(self.account_status),
            second_factor_required: self.second_factor_required,
            idle_timeout_secs: self.idle_timeout_secs,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    password_hash: String,
    login_failed_count: i16,
    last_failed_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_entity(self) -> AuthResult<Credential> {
        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|_| AuthError::Internal("stored password hash is malformed".to_string()))?;
        Ok(Credential {
            user_id: UserId::from_uuid(self.user_id),
            password_hash,
            login_failed_count: self.login_failed_count.max(0) as u16,
            last_failed_at: self.last_failed_at,
            locked_until: self.locked_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    challenge_id: Uuid,
    user_id: Uuid,
    purpose: i16,
    code_digest: Vec<u8>,
    used: bool,
    attempts_remaining: i16,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ChallengeRow {
    fn into_entity(self) -> AuthResult<PendingChallenge> {
        let purpose = ChallengePurpose::from_i16(self.purpose)
            .ok_or_else(|| AuthError::Internal("unknown challenge purpose".to_string()))?;
        Ok(PendingChallenge {
            challenge_id: ChallengeId::from_uuid(self.challenge_id),
            user_id: UserId::from_uuid(self.user_id),
            purpose,
            code_digest: self.code_digest,
            used: self.used,
            attempts_remaining: self.attempts_remaining,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: Uuid,
    device: Option<String>,
    origin: Option<String>,
    trusted: bool,
    active: bool,
    idle_timeout_secs: i32,
    expires_at_ms: i64,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_entity(self) -> UserSession {
        UserSession {
            session_id: SessionId::from_uuid(self.session_id),
            user_id: UserId::from_uuid(self.user_id),
            device: self.device,
            origin: self.origin,
            trusted: self.trusted,
            active: self.active,
            idle_timeout_secs: self.idle_timeout_secs as i64,
            expires_at_ms: self.expires_at_ms,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RateLimitRow {
    window_start_ms: i64,
    request_count: i32,
}

// ============================================================================
// Users
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, username, email, account_status, second_factor_required,
                   idle_timeout_secs, last_login_at, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_entity))
    }

    async fn find_user_by_username(&self, canonical: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, username, email, account_status, second_factor_required,
                   idle_timeout_secs, last_login_at, created_at, updated_at
            FROM users
            WHERE username_canonical = $1
            "#,
        )
        .bind(canonical)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_entity))
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, username, email, account_status, second_factor_required,
                   idle_timeout_secs, last_login_at, created_at, updated_at
            FROM users
            WHERE lower(email) = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_entity))
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET account_status = $2, second_factor_required = $3,
                idle_timeout_secs = $4, last_login_at = $5, updated_at = $6
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.status.as_i16())
        .bind(user.second_factor_required)
        .bind(user.idle_timeout_secs)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Credentials
// ============================================================================

impl CredentialRepository for PgAuthRepository {
    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT user_id, password_hash, login_failed_count, last_failed_at,
                   locked_until, created_at, updated_at
            FROM auth_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRow::into_entity).transpose()
    }

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_credentials
            SET login_failed_count = $2, last_failed_at = $3, locked_until = $4,
                updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(credential.login_failed_count as i16)
        .bind(credential.last_failed_at)
        .bind(credential.locked_until)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Challenges
// ============================================================================

impl ChallengeRepository for PgAuthRepository {
    async fn replace_challenge(&self, challenge: &PendingChallenge) -> AuthResult<()> {
        // One live challenge per (user, purpose); re-issuing overwrites in
        // place so the old code stops verifying atomically.
        sqlx::query(
            r#"
            INSERT INTO auth_challenges
                (challenge_id, user_id, purpose, code_digest, used,
                 attempts_remaining, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, purpose) DO UPDATE SET
                challenge_id = EXCLUDED.challenge_id,
                code_digest = EXCLUDED.code_digest,
                used = EXCLUDED.used,
                attempts_remaining = EXCLUDED.attempts_remaining,
                issued_at = EXCLUDED.issued_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(challenge.challenge_id.as_uuid())
        .bind(challenge.user_id.as_uuid())
        .bind(challenge.purpose.as_i16())
        .bind(&challenge.code_digest)
        .bind(challenge.used)
        .bind(challenge.attempts_remaining)
        .bind(challenge.issued_at)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_challenge(
        &self,
        user_id: &UserId,
        purpose: ChallengePurpose,
    ) -> AuthResult<Option<PendingChallenge>> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT challenge_id, user_id, purpose, code_digest, used,
                   attempts_remaining, issued_at, expires_at
            FROM auth_challenges
            WHERE user_id = $1 AND purpose = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(purpose.as_i16())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChallengeRow::into_entity).transpose()
    }

    async fn update_challenge(&self, challenge: &PendingChallenge) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_challenges
            SET used = $2, attempts_remaining = $3
            WHERE challenge_id = $1
            "#,
        )
        .bind(challenge.challenge_id.as_uuid())
        .bind(challenge.used)
        .bind(challenge.attempts_remaining)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_challenge(
        &self,
        user_id: &UserId,
        purpose: ChallengePurpose,
    ) -> AuthResult<()> {
        sqlx::query("DELETE FROM auth_challenges WHERE user_id = $1 AND purpose = $2")
            .bind(user_id.as_uuid())
            .bind(purpose.as_i16())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// Sessions
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn create_session(&self, session: &UserSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions
                (session_id, user_id, device, origin, trusted, active,
                 idle_timeout_secs, expires_at_ms, created_at, last_activity_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(&session.device)
        .bind(&session.origin)
        .bind(session.trusted)
        .bind(session.active)
        .bind(session.idle_timeout_secs as i32)
        .bind(session.expires_at_ms)
        .bind(session.created_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<UserSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT session_id, user_id, device, origin, trusted, active,
                   idle_timeout_secs, expires_at_ms, created_at, last_activity_at
            FROM auth_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_entity))
    }

    async fn update_session_activity(&self, session: &UserSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_sessions
            SET last_activity_at = $2, expires_at_ms = $3
            WHERE session_id = $1 AND active = TRUE
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.last_activity_at)
        .bind(session.expires_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_sessions(&self, user_id: &UserId) -> AuthResult<Vec<UserSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT session_id, user_id, device, origin, trusted, active,
                   idle_timeout_secs, expires_at_ms, created_at, last_activity_at
            FROM auth_sessions
            WHERE user_id = $1
              AND active = TRUE
              AND expires_at_ms > $2
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Utc::now().timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SessionRow::into_entity).collect())
    }

    async fn terminate_session(&self, session_id: &SessionId) -> AuthResult<()> {
        sqlx::query("UPDATE auth_sessions SET active = FALSE WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn terminate_owned_session(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> AuthResult<bool> {
        // No active filter: terminating an already-inactive session the
        // caller owns still reports success.
        let result = sqlx::query(
            "UPDATE auth_sessions SET active = FALSE WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn terminate_user_sessions(
        &self,
        user_id: &UserId,
        spare: Option<&SessionId>,
        created_before: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET active = FALSE
            WHERE user_id = $1
              AND active = TRUE
              AND created_at <= $2
              AND ($3::uuid IS NULL OR session_id <> $3)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(created_before)
        .bind(spare.map(|s| *s.as_uuid()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

impl RateLimitRepository for PgAuthRepository {
    async fn record_hit(
        &self,
        action: &str,
        client_key: &str,
        config: &RateLimitConfig,
    ) -> AuthResult<RateLimitDecision> {
        let now_ms = Utc::now().timestamp_millis();
        let window_floor_ms = now_ms - config.window_ms();

        // Single upsert so the roll-over decision and the increment are
        // one atomic statement under concurrency.
        let row = sqlx::query_as::<_, RateLimitRow>(
            r#"
            INSERT INTO auth_rate_limits (action, client_key, window_start_ms, request_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (action, client_key) DO UPDATE SET
                request_count = CASE
                    WHEN auth_rate_limits.window_start_ms <= $4 THEN 1
                    ELSE auth_rate_limits.request_count + 1
                END,
                window_start_ms = CASE
                    WHEN auth_rate_limits.window_start_ms <= $4 THEN $3
                    ELSE auth_rate_limits.window_start_ms
                END
            RETURNING window_start_ms, request_count
            "#,
        )
        .bind(action)
        .bind(client_key)
        .bind(now_ms)
        .bind(window_floor_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(RateLimitDecision::evaluate(
            config,
            row.request_count.max(0) as u32,
            row.window_start_ms,
            now_ms,
        ))
    }
}

// ============================================================================
// Maintenance
// ============================================================================

impl MaintenanceRepository for PgAuthRepository {
    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let challenges = sqlx::query("DELETE FROM auth_challenges WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        // Hard-expired sessions, plus inactive ones old enough that no
        // listing will ever want them back.
        let sessions = sqlx::query(
            r#"
            DELETE FROM auth_sessions
            WHERE expires_at_ms <= $1
               OR (active = FALSE AND last_activity_at <= $2)
            "#,
        )
        .bind(now_ms)
        .bind(now - chrono::Duration::days(30))
        .execute(&self.pool)
        .await?
        .rows_affected();

        // Windows that ended over an hour ago can no longer refuse anyone.
        let windows = sqlx::query("DELETE FROM auth_rate_limits WHERE window_start_ms <= $1")
            .bind(now_ms - 3_600_000)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(challenges + sessions + windows)
    }
}
