//! Code delivery stub

use crate::domain::notifier::{OtpDelivery, OtpNotifier};

/// Notifier that records the dispatch without sending anything
///
/// Stands in until the mail/SMS integration is wired up. Logs the
/// recipient and validity window, never the code.
#[derive(Debug, Default, Clone)]
pub struct LogOnlyNotifier;

impl OtpNotifier for LogOnlyNotifier {
    fn dispatch(&self, delivery: OtpDelivery) {
        match &delivery.email {
            Some(email) => {
                tracing::info!(
                    email = %email,
                    username = %delivery.username,
                    purpose = %delivery.purpose,
                    expires_in_secs = delivery.expires_in_secs,
                    "verification code dispatched"
                );
            }
            None => {
                tracing::warn!(
                    username = %delivery.username,
                    purpose = %delivery.purpose,
                    "verification code generated for a user with no email on file"
                );
            }
        }
    }
}
