use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use tracing::{debug, info, instrument, warn};

use crate::core::errors::TrackerError;

/// Delivery seam for outbound chat messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one HTML message to one chat.
    async fn deliver(&self, chat_id: i64, message: &str) -> Result<(), TrackerError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Subscriber registry plus fan-out delivery.
#[derive(Clone)]
pub struct AlertBus {
    subscribers: Arc<DashSet<i64>>,
    notifier: Arc<dyn Notifier>,
}

impl AlertBus {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        debug!("AlertBus initialized");
        Self {
            subscribers: Arc::new(DashSet::new()),
            notifier,
        }
    }

    /// Returns false if the chat was already subscribed.
    pub fn subscribe(&self, chat_id: i64) -> bool {
        let added = self.subscribers.insert(chat_id);
        if added {
            info!(chat_id, subscribers = self.subscribers.len(), "✅ Chat subscribed to alerts");
        }
        added
    }

    pub fn unsubscribe(&self, chat_id: i64) -> bool {
        let removed = self.subscribers.remove(&chat_id).is_some();
        if removed {
            info!(chat_id, subscribers = self.subscribers.len(), "❌ Chat unsubscribed from alerts");
        }
        removed
    }

    pub fn is_subscribed(&self, chat_id: i64) -> bool {
        self.subscribers.contains(&chat_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    /// Direct reply to one chat, independent of the subscriber set.
    pub async fn reply(&self, chat_id: i64, message: &str) -> Result<(), TrackerError> {
        self.notifier.deliver(chat_id, message).await
    }

    /// Deliver to every current subscriber. A failed chat is logged and skipped.
    #[instrument(skip(self, message))]
    pub async fn publish(&self, message: &str) -> DeliveryReport {
        // Snapshot first so no shard lock is held across an await
        let recipients: Vec<i64> = self.subscribers.iter().map(|id| *id).collect();
        let mut report = DeliveryReport::default();

        for chat_id in recipients {
            match self.notifier.deliver(chat_id, message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(chat_id, error = %e, "❌ Error sending to chat");
                    report.failed += 1;
                }
            }
        }

        debug!(delivered = report.delivered, failed = report.failed, "Published alert");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(i64, String)>>,
        reject: Vec<i64>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver(&self, chat_id: i64, message: &str) -> Result<(), TrackerError> {
            if self.reject.contains(&chat_id) {
                return Err(TrackerError::Delivery("bot was blocked by the user".into()));
            }
            self.sent.lock().await.push((chat_id, message.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let bus = AlertBus::new(Arc::new(RecordingNotifier::default()));
        assert!(bus.subscribe(1));
        assert!(!bus.subscribe(1));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(1));
        assert!(!bus.unsubscribe(1));
        assert!(!bus.has_subscribers());
    }

    #[tokio::test]
    async fn test_publish_survives_failed_chat() {
        let notifier = Arc::new(RecordingNotifier { reject: vec![2], ..Default::default() });
        let bus = AlertBus::new(notifier.clone());
        for id in [1, 2, 3] {
            bus.subscribe(id);
        }

        let report = bus.publish("<b>alert</b>").await;
        assert_eq!(report, DeliveryReport { delivered: 2, failed: 1 });

        let mut recipients: Vec<i64> = notifier.sent.lock().await.iter().map(|(id, _)| *id).collect();
        recipients.sort();
        assert_eq!(recipients, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = AlertBus::new(Arc::new(RecordingNotifier::default()));
        assert_eq!(bus.publish("nobody").await, DeliveryReport::default());
    }
}
