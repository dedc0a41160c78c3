//! Receiving end of the notification hand-off.
//!
//! Recovery workflows run in a separate engine; this task only drains the
//! channel and records each hand-off.

use failsafe_model::Notification;
use tokio::sync::mpsc;
use tracing::info;

/// Drain `rx` until every sender is gone. Returns the number of
/// notifications received.
pub async fn run(mut rx: mpsc::Receiver<Notification>) -> usize {
    let mut received = 0;
    while let Some(notification) = rx.recv().await {
        received += 1;
        info!(
            uuid = %notification.notification_uuid,
            kind = notification.notification_type.as_str(),
            source_host = %notification.source_host_uuid,
            generated_time = %notification.generated_time,
            "notification handed to recovery engine"
        );
    }
    info!(received, "recovery channel closed");
    received
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use failsafe_ha_core::{ChannelNotifier, Notifier};
    use failsafe_model::{NotificationStatus, NotificationType};

    use super::*;

    fn notification() -> Notification {
        Notification {
            id: 1,
            notification_uuid: "n-1".to_owned(),
            generated_time: Utc::now(),
            notification_type: NotificationType::Vm,
            payload: serde_json::json!({"event": "LIFECYCLE"}),
            source_host_uuid: "h-1".to_owned(),
            status: NotificationStatus::New,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_should_drain_until_senders_drop() {
        let (notifier, rx) = ChannelNotifier::new(4);
        notifier.notify(&notification()).unwrap();
        notifier.notify(&notification()).unwrap();
        drop(notifier);
        assert_eq!(run(rx).await, 2);
    }
}
