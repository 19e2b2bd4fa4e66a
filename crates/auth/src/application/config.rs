//! Authentication configuration

use platform::cookie::{CookieConfig, SameSite};
use platform::crypto::random_bytes;
use platform::rate_limit::RateLimitConfig;

/// Rate-limited actions and their fixed budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    Login,
    VerifyOtp,
    ResendOtp,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::VerifyOtp => "verify_otp",
            Self::ResendOtp => "resend_otp",
        }
    }
}

/// Authentication configuration
///
/// Timing and budget constants are fixed here rather than spread through
/// the flows; the deployment only chooses the secret and cookie policy.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for session/pending tokens and CSRF tokens
    pub secret: [u8; 32],
    /// Optional application-wide pepper mixed into password hashing
    pub pepper: Option<Vec<u8>>,
    pub session_cookie: CookieConfig,
    pub pending_cookie: CookieConfig,
}

impl AuthConfig {
    /// One-time code validity window
    pub const OTP_TTL_SECS: i64 = 600;
    /// Verification attempts per issued code
    pub const OTP_MAX_ATTEMPTS: u16 = 5;

    /// Hard session lifetime
    pub const SESSION_LIFETIME_SECS: i64 = 12 * 60 * 60;
    /// Hard session lifetime for trusted-device sign-ins
    pub const SESSION_LIFETIME_TRUSTED_SECS: i64 = 7 * 24 * 60 * 60;
    /// Pending-verification cookie lifetime; outlives the code slightly so
    /// the client can still reach the resend endpoint
    pub const PENDING_COOKIE_SECS: i64 = 15 * 60;

    /// Idle timeout applied when the user has no preference
    pub const IDLE_TIMEOUT_DEFAULT_SECS: i64 = 1800;
    pub const IDLE_TIMEOUT_MIN_SECS: i64 = 300;
    pub const IDLE_TIMEOUT_MAX_SECS: i64 = 3600;

    pub const LOGIN_RATE_LIMIT: RateLimitConfig = RateLimitConfig::new(5, 300);
    pub const VERIFY_OTP_RATE_LIMIT: RateLimitConfig = RateLimitConfig::new(10, 600);
    pub const RESEND_OTP_RATE_LIMIT: RateLimitConfig = RateLimitConfig::new(3, 300);

    pub fn new(secret: [u8; 32], cookie_secure: bool) -> Self {
        Self {
            secret,
            pepper: None,
            session_cookie: CookieConfig {
                name: "clinical_session".to_string(),
                secure: cookie_secure,
                http_only: true,
                same_site: SameSite::Lax,
                path: "/".to_string(),
            },
            pending_cookie: CookieConfig {
                name: "clinical_pending_2fa".to_string(),
                secure: cookie_secure,
                http_only: true,
                same_site: SameSite::Lax,
                path: "/".to_string(),
            },
        }
    }

    /// Config with a random secret and non-secure cookies, for local
    /// development only; tokens do not survive a restart
    pub fn development() -> Self {
        let bytes = random_bytes(32);
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes);
        Self::new(secret, false)
    }

    pub fn with_pepper(mut self, pepper: Vec<u8>) -> Self {
        self.pepper = Some(pepper);
        self
    }

    pub fn pepper_bytes(&self) -> Option<&[u8]> {
        self.pepper.as_deref()
    }

    pub fn rate_limit(&self, action: RateLimitAction) -> RateLimitConfig {
        match action {
            RateLimitAction::Login => Self::LOGIN_RATE_LIMIT,
            RateLimitAction::VerifyOtp => Self::VERIFY_OTP_RATE_LIMIT,
            RateLimitAction::ResendOtp => Self::RESEND_OTP_RATE_LIMIT,
        }
    }

    /// Hard lifetime for a new session
    pub fn session_lifetime_secs(&self, trusted: bool) -> i64 {
        if trusted {
            Self::SESSION_LIFETIME_TRUSTED_SECS
        } else {
            Self::SESSION_LIFETIME_SECS
        }
    }

    /// Resolve a user's idle timeout, clamping the preference into the
    /// allowed range
    pub fn effective_idle_timeout_secs(&self, preference: Option<i32>) -> i64 {
        match preference {
            Some(pref) => {
                (pref as i64).clamp(Self::IDLE_TIMEOUT_MIN_SECS, Self::IDLE_TIMEOUT_MAX_SECS)
            }
            None => Self::IDLE_TIMEOUT_DEFAULT_SECS,
        }
    }
}
