//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the auth service:
//! - Cryptographic utilities (SHA-256, HMAC, Base64, numeric codes)
//! - Password hashing (Argon2id)
//! - Cookie construction and extraction
//! - Client identification (IP, device descriptor)
//! - Rate limiting vocabulary

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
