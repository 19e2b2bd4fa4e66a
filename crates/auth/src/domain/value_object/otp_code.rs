//! One-time verification codes

use std::fmt;

use platform::crypto::{random_digits, sha256};
use thiserror::Error;

/// Number of digits in a generated code
pub const OTP_CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpCodeError {
    #[error("Code must be exactly {OTP_CODE_LENGTH} digits")]
    InvalidFormat,
}

/// A one-time numeric code
///
/// Only the SHA-256 digest is ever persisted; the cleartext exists just
/// long enough to hand to the notifier. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Generate a fresh random code
    pub fn generate() -> Self {
        Self(random_digits(OTP_CODE_LENGTH))
    }

    /// Parse a user-submitted code, rejecting anything that is not
    /// exactly the expected digit string
    pub fn parse(raw: &str) -> Result<Self, OtpCodeError> {
        let trimmed = raw.trim();
        if trimmed.len() != OTP_CODE_LENGTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpCodeError::InvalidFormat);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest stored in place of the cleartext code
    pub fn digest(&self) -> [u8; 32] {
        sha256(self.0.as_bytes())
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OtpCode").field(&"[REDACTED]").finish()
    }
}
