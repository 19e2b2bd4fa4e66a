//! Authentication error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kernel::error::{AppError, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the authentication flows
///
/// Messages are user-facing; anything sensitive stays in the `source`
/// of the `Database`/`Internal` variants and is only logged.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password field is missing/blank
    #[error("Username and password are required")]
    MissingCredentials,

    /// Unknown user, disabled-like states we refuse to distinguish, or
    /// password mismatch
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Too many consecutive failures; locked until the timestamp passes
    #[error("Account is temporarily locked. Try again later")]
    AccountLocked,

    /// Account exists but is administratively disabled
    #[error("Account is disabled")]
    AccountDisabled,

    /// Submitted code is not the expected digit string
    #[error("Verification code must be {expected_len} digits")]
    BadOtpFormat { expected_len: usize },

    /// No pending challenge for this user/purpose
    #[error("Verification code expired or not found")]
    ChallengeNotFound,

    /// Challenge exists but its validity window has passed
    #[error("Verification code has expired")]
    ChallengeExpired,

    /// Code mismatch; carries attempts left before the challenge is torn down
    #[error("Invalid verification code")]
    InvalidOtp { remaining_attempts: u16 },

    /// No pending sign-in to attach this request to
    #[error("No sign-in awaiting verification")]
    PendingLoginMissing,

    /// Session cookie absent, malformed, expired or terminated
    #[error("Session is invalid or expired")]
    SessionInvalid,

    /// Referenced session does not exist or belongs to another user
    #[error("Session not found")]
    SessionNotFound,

    /// CSRF token missing or failed validation
    #[error("Request could not be validated")]
    CsrfRejected,

    /// Budget for this action is exhausted
    #[error("Too many attempts. Try again later")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal error")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials | Self::BadOtpFormat { .. } => ErrorKind::UnprocessableEntity,
            Self::InvalidCredentials | Self::InvalidOtp { .. } | Self::SessionInvalid => {
                ErrorKind::Unauthorized
            }
            Self::AccountLocked => ErrorKind::Locked,
            Self::AccountDisabled | Self::CsrfRejected => ErrorKind::Forbidden,
            Self::ChallengeNotFound | Self::ChallengeExpired => ErrorKind::Gone,
            Self::PendingLoginMissing => ErrorKind::BadRequest,
            Self::SessionNotFound => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::TooManyRequests,
            Self::Database(_) | Self::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Log with a severity matching the classification
    pub fn log(&self) {
        match self {
            Self::Database(e) => tracing::error!(error = %e, "auth database error"),
            Self::Internal(msg) => tracing::error!(error = %msg, "auth internal error"),
            Self::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "rate limited")
            }
            other => tracing::debug!(error = %other, "auth request rejected"),
        }
    }

    fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            Self::RateLimited { retry_after_secs } => err.with_retry_after(*retry_after_secs),
            _ => err,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();

        // A failed code check carries the remaining budget so the client
        // can show it; everything else uses the plain envelope.
        if let Self::InvalidOtp { remaining_attempts } = &self {
            let body = json!({
                "success": false,
                "error": self.to_string(),
                "data": { "remaining_attempts": remaining_attempts },
            });
            return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        }

        // The kernel mapping renders the envelope and the Retry-After
        // header carried by the rate-limited variant.
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::MissingCredentials.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::AccountLocked.status_code(), StatusCode::LOCKED);
        assert_eq!(
            AuthError::AccountDisabled.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AuthError::CsrfRejected.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::ChallengeNotFound.status_code(), StatusCode::GONE);
        assert_eq!(
            AuthError::SessionInvalid.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::SessionNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::RateLimited {
                retry_after_secs: 60
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_messages_do_not_leak_detail() {
        let err = AuthError::Internal("connection pool exhausted".to_string());
        assert_eq!(err.to_string(), "Internal error");

        // Unknown user and bad password read identically
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
    }
}
