//! Hand-off of accepted notifications to the recovery engine.

use failsafe_model::Notification;
use tokio::sync::mpsc;
use tracing::debug;

/// Default capacity of the notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("recovery engine queue is full")]
    Full,

    #[error("recovery engine is not running")]
    Closed,
}

/// Delivers notifications to whatever processes them.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifierError>;
}

/// Sends notifications over a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// A notifier and the receiving end the recovery engine reads from.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        self.tx
            .try_send(notification.clone())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NotifierError::Full,
                mpsc::error::TrySendError::Closed(_) => NotifierError::Closed,
            })?;
        debug!(uuid = %notification.notification_uuid, "queued notification for recovery");
        Ok(())
    }
}
