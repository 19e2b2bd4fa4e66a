//! Account status

/// Administrative state of a user account
///
/// Temporal lockout after repeated failures is tracked on the credential
/// record, not here; this flag only changes through administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountStatus {
    #[default]
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn can_login(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Active => 0,
            Self::Disabled => 1,
        }
    }

    pub fn from_i16(value: i16) -> Self {
        match value {
            0 => Self::Active,
            _ => Self::Disabled,
        }
    }
}
