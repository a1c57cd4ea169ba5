use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

pub type NotificationReceiver = broadcast::Receiver<Notification>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// A transient message for the global notification area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub code: Option<String>,
}

/// The single channel every booking surface reports server outcomes on.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> NotificationReceiver {
        self.sender.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        // No subscriber is not an error; the message is simply not shown.
        if self.sender.send(notification).is_err() {
            debug!("Notification dropped, no subscribers");
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notification {
            level: NotificationLevel::Success,
            message: message.into(),
            code: None,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(Notification {
            level: NotificationLevel::Info,
            message: message.into(),
            code: None,
        });
    }

    pub fn error(&self, message: impl Into<String>, code: Option<String>) {
        self.publish(Notification {
            level: NotificationLevel::Error,
            message: message.into(),
            code,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let hub = NotificationHub::default();
        let mut rx = hub.subscribe();

        hub.success("Booked");
        hub.error("All slots for that day are already taken.", Some("capacity_full".to_string()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, NotificationLevel::Success);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.code.as_deref(), Some("capacity_full"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = NotificationHub::new(0);
        hub.info("nobody listening");
    }
}
