pub mod account_status;
pub mod otp_code;
pub mod purpose;

pub use account_status::AccountStatus;
pub use otp_code::{OTP_CODE_LENGTH, OtpCode, OtpCodeError};
pub use purpose::ChallengePurpose;
