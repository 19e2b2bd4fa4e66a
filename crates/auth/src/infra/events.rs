//! Event sink backed by structured logging

use crate::domain::events::{AuthEvent, EventSink};

/// Writes every authentication event to the tracing subscriber
///
/// Field names are stable so downstream log tooling can key off them;
/// an audit-trail sink would implement [`EventSink`] the same way.
#[derive(Debug, Default, Clone)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: AuthEvent) {
        match event {
            AuthEvent::LoginFailed { user_id, reason } => {
                tracing::warn!(user_id = ?user_id.map(|u| u.to_string()), reason, "login failed");
            }
            AuthEvent::LoginLockedOut { user_id } => {
                tracing::warn!(user_id = %user_id, "login refused, credential locked");
            }
            AuthEvent::ChallengeIssued { user_id, purpose } => {
                tracing::info!(user_id = %user_id, purpose = %purpose, "verification code issued");
            }
            AuthEvent::ChallengeFailed {
                user_id,
                purpose,
                remaining_attempts,
            } => {
                tracing::warn!(
                    user_id = %user_id,
                    purpose = %purpose,
                    remaining_attempts,
                    "verification code mismatch"
                );
            }
            AuthEvent::ChallengeExpired { user_id, purpose } => {
                tracing::info!(user_id = %user_id, purpose = %purpose, "verification code expired");
            }
            AuthEvent::SessionCreated {
                session_id,
                user_id,
                trusted,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    user_id = %user_id,
                    trusted,
                    "session created"
                );
            }
            AuthEvent::SessionIdleTimeout {
                session_id,
                user_id,
            } => {
                tracing::info!(session_id = %session_id, user_id = %user_id, "session idle timeout");
            }
            AuthEvent::SessionTerminated { session_id } => {
                tracing::info!(session_id = %session_id, "session terminated");
            }
            AuthEvent::SessionsTerminated { user_id, count } => {
                tracing::info!(user_id = %user_id, count, "sessions terminated in bulk");
            }
            AuthEvent::RateLimited { action, client_key } => {
                tracing::warn!(action, client_key = %client_key, "rate limited");
            }
        }
    }
}
