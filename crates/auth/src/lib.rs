//! Authentication and session lifecycle
//!
//! Credential verification with an email one-time-code second factor,
//! server-side multi-device sessions with idle and hard expiry, CSRF
//! validation and per-client rate limiting. Layout follows the usual
//! split: `domain` holds entities and storage traits, `application` the
//! flows, `infra` the Postgres/logging implementations, `presentation`
//! the HTTP surface.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

pub use error::{AuthError, AuthResult};
pub use presentation::auth_router;
