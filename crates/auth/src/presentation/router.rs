//! Route table for the authentication endpoints

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::application::config::AuthConfig;
use crate::domain::events::EventSink;
use crate::domain::notifier::OtpNotifier;
use crate::domain::repository::AuthStore;
use crate::presentation::handlers::{
    self, AuthAppState,
};

/// Build the authentication router; mount under `/auth`
pub fn auth_router<R: AuthStore>(
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn OtpNotifier>,
) -> Router {
    let state = AuthAppState::new(repo, config, events, notifier);

    Router::new()
        .route("/login", post(handlers::login::<R>))
        .route("/verify-2fa", post(handlers::verify_2fa::<R>))
        .route("/resend-otp", post(handlers::resend_otp::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .route("/current-user", get(handlers::current_user::<R>))
        .route("/csrf-token", get(handlers::csrf_token_endpoint::<R>))
        .route("/refresh-session", post(handlers::refresh_session::<R>))
        .route("/session-status", get(handlers::session_status::<R>))
        .route("/ping-activity", post(handlers::ping_activity::<R>))
        .route("/active-sessions", get(handlers::active_sessions::<R>))
        .route("/logout-session", post(handlers::logout_session::<R>))
        .route("/logout-all", post(handlers::logout_all::<R>))
        .route("/logout-everywhere", post(handlers::logout_everywhere::<R>))
        .with_state(state)
}
