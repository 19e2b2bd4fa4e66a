//! Challenge purpose

use std::fmt;

/// What a pending verification challenge is for
///
/// A user holds at most one live challenge per purpose; issuing a new
/// one replaces the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengePurpose {
    /// Second factor during sign-in
    Login,
    /// Account recovery initiated by email
    PasswordReset,
}

impl ChallengePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::PasswordReset => "password_reset",
        }
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Login => 0,
            Self::PasswordReset => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Login),
            1 => Some(Self::PasswordReset),
            _ => None,
        }
    }

    /// Single-character code used inside signed correlation tokens
    pub fn token_code(&self) -> &'static str {
        match self {
            Self::Login => "l",
            Self::PasswordReset => "r",
        }
    }

    pub fn from_token_code(code: &str) -> Option<Self> {
        match code {
            "l" => Some(Self::Login),
            "r" => Some(Self::PasswordReset),
            _ => None,
        }
    }
}

impl fmt::Display for ChallengePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
