use thiserror::Error;

use crate::domain::entities::alert::Dispatch;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
}

/// Outbound side of alerting: receives every dispatch decision.
///
/// Delivery is attempted at least once per decision; receivers deduplicate
/// by the event fingerprint.
pub trait Notifier: Send + Sync {
    /// Deliver one dispatch decision.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the notification fails to send
    /// or the channel is unavailable.
    fn notify(&self, dispatch: &Dispatch) -> Result<(), NotificationError>;
}
