//! Request and response shapes for the authentication endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::{ActivityStatus, SessionInfo, User};

// ============================================================================
// Envelope
// ============================================================================

/// Uniform response envelope
///
/// Success responses carry `success: true` and optionally a message;
/// error responses are produced by the error type and carry `error`.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiEnvelope<serde_json::Value> {
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub trust_device: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
    #[serde(default)]
    pub trust_device: bool,
}

/// Body for CSRF-protected calls that otherwise need nothing
#[derive(Debug, Default, Deserialize)]
pub struct CsrfProtectedRequest {
    #[serde(default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PingActivityRequest {
    /// Client-declared last activity, epoch milliseconds; used only when
    /// no durable session resolves
    #[serde(default)]
    pub last_activity_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutSessionRequest {
    pub session_id: Uuid,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// `"authenticated"` or `"pending_2fa"`
    pub stage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Validity window of the issued code, seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ResendOtpResponse {
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct RefreshSessionResponse {
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub session_valid: bool,
    pub degraded: bool,
    pub remaining_time: i64,
    pub idle_timeout: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl From<ActivityStatus> for ActivityResponse {
    fn from(status: ActivityStatus) -> Self {
        Self {
            session_valid: status.session_valid,
            degraded: status.degraded,
            remaining_time: status.remaining_secs,
            idle_timeout: status.idle_timeout_secs,
            expires_at: status.expires_at_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user_id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub second_factor_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<i64>,
}

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: *user.user_id.as_uuid(),
            username: user.username.clone(),
            email: user.email.clone(),
            second_factor_required: user.second_factor_required,
            last_login_at: user.last_login_at_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionEntry {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_current: bool,
}

impl From<SessionInfo> for SessionEntry {
    fn from(info: SessionInfo) -> Self {
        Self {
            id: *info.session_id.as_uuid(),
            device: info.device,
            origin: info.origin,
            created_at: info.created_at,
            last_activity: info.last_activity_at,
            is_current: info.is_current,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActiveSessionsResponse {
    pub sessions: Vec<SessionEntry>,
}

#[derive(Debug, Serialize)]
pub struct TerminatedCountResponse {
    pub count: u64,
}
