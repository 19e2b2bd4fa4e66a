//! HTTP handlers for the authentication endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use kernel::id::SessionId;
use platform::cookie::set_cookie_header;

use crate::application::activity::PingActivityUseCase;
use crate::application::check_session::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::application::context::AuthContext;
use crate::application::csrf::{csrf_token, csrf_token_valid};
use crate::application::login::{LoginInput, LoginOutcome, LoginUseCase};
use crate::application::logout::LogoutUseCase;
use crate::application::mint_session::SessionHandle;
use crate::application::resend_otp::ResendOtpUseCase;
use crate::application::sessions::{ListSessionsUseCase, RefreshSessionUseCase};
use crate::application::token::parse_session_token;
use crate::application::verify_otp::{VerifyOtpInput, VerifyOtpUseCase};
use crate::domain::events::EventSink;
use crate::domain::notifier::OtpNotifier;
use crate::domain::repository::{AuthStore, UserRepository};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ActiveSessionsResponse, ActivityResponse, ApiEnvelope, CsrfProtectedRequest,
    CsrfTokenResponse, CurrentUserResponse, LoginRequest, LoginResponse, LogoutSessionRequest,
    PingActivityRequest, RefreshSessionResponse, ResendOtpResponse, SessionStatusResponse,
    TerminatedCountResponse, VerifyOtpRequest, VerifyOtpResponse,
};

/// Shared state for the authentication routes
pub struct AuthAppState<R> {
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub events: Arc<dyn EventSink>,
    pub notifier: Arc<dyn OtpNotifier>,
}

impl<R> Clone for AuthAppState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<R> AuthAppState<R> {
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
}

// ============================================================================
// Helpers
// ============================================================================

fn context(
    state_config: &AuthConfig,
    headers: &HeaderMap,
    addr: SocketAddr,
) -> AuthContext {
    AuthContext::from_request(state_config, headers, Some(addr.ip()))
}

/// Append a session cookie for a freshly minted session
fn set_session_cookie(response: &mut Response, config: &AuthConfig, session: &SessionHandle) {
    response.headers_mut().append(
        header::SET_COOKIE,
        set_cookie_header(&config.session_cookie, &session.token, session.lifetime_secs),
    );
}

fn delete_cookie(response: &mut Response, cookie: &platform::cookie::CookieConfig) {
    if let Ok(value) = axum::http::HeaderValue::from_str(&cookie.build_delete_cookie()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// Enforce CSRF for a state-changing call bound to `session_id`
///
/// Accepts the token from either accepted header or the JSON body.
fn require_csrf(
    config: &AuthConfig,
    session_id: &SessionId,
    ctx: &AuthContext,
    body_token: Option<&str>,
) -> AuthResult<()> {
    let submitted = ctx
        .csrf_header
        .as_deref()
        .or(body_token)
        .ok_or(AuthError::CsrfRejected)?;
    if !csrf_token_valid(&config.secret, session_id, submitted) {
        return Err(AuthError::CsrfRejected);
    }
    Ok(())
}

// ============================================================================
// Sign-in flow
// ============================================================================

pub async fn login<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let use_case = LoginUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
        state.notifier.clone(),
    );
    let outcome = use_case
        .execute(
            LoginInput {
                username: req.username,
                password: req.password,
                trust_device: req.trust_device,
            },
            &ctx,
        )
        .await?;

    match outcome {
        LoginOutcome::Authenticated { session } => {
            let body = ApiEnvelope::ok_with_message(
                "Signed in",
                LoginResponse {
                    stage: "authenticated",
                    expires_at: Some(session.expires_at_ms),
                    expires_in: None,
                },
            );
            let mut response = (StatusCode::OK, Json(body)).into_response();
            set_session_cookie(&mut response, &state.config, &session);
            delete_cookie(&mut response, &state.config.pending_cookie);
            Ok(response)
        }
        LoginOutcome::PendingVerification {
            pending_token,
            expires_in_secs,
        } => {
            let body = ApiEnvelope::ok_with_message(
                "Verification code sent",
                LoginResponse {
                    stage: "pending_2fa",
                    expires_at: None,
                    expires_in: Some(expires_in_secs),
                },
            );
            let mut response = (StatusCode::OK, Json(body)).into_response();
            response.headers_mut().append(
                header::SET_COOKIE,
                set_cookie_header(
                    &state.config.pending_cookie,
                    &pending_token,
                    AuthConfig::PENDING_COOKIE_SECS,
                ),
            );
            Ok(response)
        }
    }
}

pub async fn verify_2fa<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let use_case = VerifyOtpUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let session = use_case
        .execute(
            VerifyOtpInput {
                code: req.code,
                trust_device: req.trust_device,
            },
            &ctx,
        )
        .await?;

    let body = ApiEnvelope::ok_with_message(
        "Signed in",
        VerifyOtpResponse {
            expires_at: session.expires_at_ms,
        },
    );
    let mut response = (StatusCode::OK, Json(body)).into_response();
    set_session_cookie(&mut response, &state.config, &session);
    delete_cookie(&mut response, &state.config.pending_cookie);
    Ok(response)
}

pub async fn resend_otp<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let use_case = ResendOtpUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
        state.notifier.clone(),
    );
    let expires_in = use_case.execute(&ctx).await?;

    let body = ApiEnvelope::ok_with_message(
        "Verification code sent",
        ResendOtpResponse {
            expires_in,
        },
    );
    Ok((StatusCode::OK, Json(body)).into_response())
}

// ============================================================================
// Session state
// ============================================================================

pub async fn current_user<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let session = checker.resolve(ctx.session_token.as_deref()).await?;

    let user = state
        .repo
        .find_user_by_id(&session.user_id)
        .await?
        .ok_or_else(|| AuthError::Internal("session refers to a missing user".to_string()))?;

    let body = ApiEnvelope::ok(CurrentUserResponse::from(&user));
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub async fn session_status<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let body = match checker
        .resolve_without_touch(ctx.session_token.as_deref())
        .await
    {
        Ok(session) => ApiEnvelope::ok(SessionStatusResponse {
            authenticated: true,
            user_id: Some(*session.user_id.as_uuid()),
            expires_at: Some(session.expires_at_ms),
            remaining_time: Some(session.idle_remaining_secs()),
        }),
        Err(e) if e.kind().is_server_error() => return Err(e),
        Err(_) => ApiEnvelope::ok(SessionStatusResponse {
            authenticated: false,
            user_id: None,
            expires_at: None,
            remaining_time: None,
        }),
    };

    Ok((StatusCode::OK, Json(body)).into_response())
}

pub async fn csrf_token_endpoint<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let session = checker.resolve(ctx.session_token.as_deref()).await?;

    let body = ApiEnvelope::ok(CsrfTokenResponse {
        token: csrf_token(&state.config.secret, &session.session_id),
    });
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub async fn refresh_session<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<CsrfProtectedRequest>>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let session = checker
        .resolve_without_touch(ctx.session_token.as_deref())
        .await?;
    require_csrf(
        &state.config,
        &session.session_id,
        &ctx,
        body.csrf_token.as_deref(),
    )?;

    let use_case = RefreshSessionUseCase::new(state.repo.clone(), state.config.clone());
    let (expires_at_ms, lifetime_secs) = use_case.execute(session).await?;

    let envelope = ApiEnvelope::ok_with_message(
        "Session refreshed",
        RefreshSessionResponse {
            expires_at: expires_at_ms,
        },
    );
    let mut response = (StatusCode::OK, Json(envelope)).into_response();
    if let Some(token) = &ctx.session_token {
        response.headers_mut().append(
            header::SET_COOKIE,
            set_cookie_header(&state.config.session_cookie, token, lifetime_secs),
        );
    }
    Ok(response)
}

pub async fn ping_activity<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<PingActivityRequest>>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let use_case = PingActivityUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let status = use_case
        .execute(ctx.session_token.as_deref(), body.last_activity_ms)
        .await?;

    let envelope = ApiEnvelope::ok(ActivityResponse::from(status));
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

// ============================================================================
// Termination
// ============================================================================

pub async fn logout<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<CsrfProtectedRequest>>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);
    let body = body.map(|Json(b)| b).unwrap_or_default();

    // CSRF is checked against the signed cookie itself; a caller with no
    // usable cookie has nothing to destroy and signs out trivially.
    if let Some(token) = ctx.session_token.as_deref() {
        if let Some(session_uuid) = parse_session_token(&state.config.secret, token) {
            require_csrf(
                &state.config,
                &SessionId::from_uuid(session_uuid),
                &ctx,
                body.csrf_token.as_deref(),
            )?;
        }
    }

    let use_case = LogoutUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    use_case.execute(ctx.session_token.as_deref()).await?;

    let envelope = ApiEnvelope::ok_empty("Signed out");
    let mut response = (StatusCode::OK, Json(envelope)).into_response();
    delete_cookie(&mut response, &state.config.session_cookie);
    delete_cookie(&mut response, &state.config.pending_cookie);
    Ok(response)
}

pub async fn logout_session<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LogoutSessionRequest>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let caller = checker
        .resolve_without_touch(ctx.session_token.as_deref())
        .await?;
    require_csrf(
        &state.config,
        &caller.session_id,
        &ctx,
        req.csrf_token.as_deref(),
    )?;

    let use_case = LogoutUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    use_case.execute_one(&caller, req.session_id).await?;

    let envelope = ApiEnvelope::ok_empty("Session terminated");
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

pub async fn active_sessions<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);

    let use_case = ListSessionsUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let sessions = use_case.execute(ctx.session_token.as_deref()).await?;

    let envelope = ApiEnvelope::ok(ActiveSessionsResponse {
        sessions: sessions.into_iter().map(Into::into).collect(),
    });
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

pub async fn logout_all<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<CsrfProtectedRequest>>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let caller = checker
        .resolve_without_touch(ctx.session_token.as_deref())
        .await?;
    require_csrf(
        &state.config,
        &caller.session_id,
        &ctx,
        body.csrf_token.as_deref(),
    )?;

    let use_case = LogoutUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let count = use_case.execute_all_others(&caller).await?;

    let envelope = ApiEnvelope::ok_with_message(
        "Other sessions terminated",
        TerminatedCountResponse { count },
    );
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

pub async fn logout_everywhere<R: AuthStore>(
    State(state): State<AuthAppState<R>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Option<Json<CsrfProtectedRequest>>,
) -> Result<Response, AuthError> {
    let ctx = context(&state.config, &headers, addr);
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let checker = CheckSessionUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let caller = checker
        .resolve_without_touch(ctx.session_token.as_deref())
        .await?;
    require_csrf(
        &state.config,
        &caller.session_id,
        &ctx,
        body.csrf_token.as_deref(),
    )?;

    let use_case = LogoutUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let count = use_case.execute_everywhere(&caller).await?;

    let envelope = ApiEnvelope::ok_with_message(
        "Signed out everywhere",
        TerminatedCountResponse { count },
    );
    let mut response = (StatusCode::OK, Json(envelope)).into_response();
    delete_cookie(&mut response, &state.config.session_cookie);
    Ok(response)
}
