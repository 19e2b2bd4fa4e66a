pub mod activity;
pub mod check_session;
pub mod config;
pub mod context;
pub mod csrf;
pub mod issue_otp;
pub mod login;
pub mod logout;
pub mod mint_session;
pub mod resend_otp;
pub mod sessions;
pub mod token;
pub mod verify_otp;
