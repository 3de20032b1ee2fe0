use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::notification::{PlacementNotification, PlacementNotifier};

// ============================================================================
// Mail Outbox
// ============================================================================
//
// Notifications are serialized into an outbox; a mail relay drains it and
// owns rendering, delivery and bounces.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub topic: String,
    /// Partition key; the order number keeps one order's mails in sequence
    pub key: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

pub struct OutboxNotifier {
    topic: String,
    messages: Mutex<Vec<OutboxMessage>>,
}

impl OutboxNotifier {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub async fn pending(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// Hand every queued message to the relay
    pub async fn drain(&self) -> Vec<OutboxMessage> {
        std::mem::take(&mut *self.messages.lock().await)
    }
}

#[async_trait]
impl PlacementNotifier for OutboxNotifier {
    async fn send_placement(&self, notification: &PlacementNotification) -> Result<()> {
        let message = OutboxMessage {
            id: Uuid::now_v7(),
            topic: self.topic.clone(),
            key: notification.order_number.clone(),
            payload: serde_json::to_string(notification)?,
            created_at: Utc::now(),
        };

        tracing::info!(
            topic = %message.topic,
            order_number = %message.key,
            changes = notification.changes.len(),
            "📧 Queued placement notification"
        );

        self.messages.lock().await.push(message);
        Ok(())
    }
}
