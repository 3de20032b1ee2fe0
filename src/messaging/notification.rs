use async_trait::async_trait;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{OrderAggregate, QuantityChanges};

// ============================================================================
// Placement Notification
// ============================================================================
//
// Payload handed to the customer-facing mailer once a standing order has
// been placed. Rendering and delivery live on the other side of the
// PlacementNotifier trait.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifiedLineItem {
    pub line_item_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: u32,
    /// Present only when the quantity was reduced for lack of stock
    pub requested_quantity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacementNotification {
    pub kind: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub email: String,
    pub standing_order_id: Option<Uuid>,
    pub item_total_cents: i64,
    pub line_items: Vec<NotifiedLineItem>,
    pub changes: QuantityChanges,
}

impl PlacementNotification {
    pub const KIND: &'static str = "placement";

    pub fn for_order(order: &OrderAggregate, changes: &QuantityChanges) -> Self {
        let line_items = order
            .line_items
            .iter()
            .map(|item| NotifiedLineItem {
                line_item_id: item.id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                requested_quantity: changes.original_quantity(&item.id),
            })
            .collect();

        Self {
            kind: Self::KIND.to_string(),
            order_id: order.id,
            order_number: order.number.clone(),
            email: order.email.clone(),
            standing_order_id: order.standing_order_id,
            item_total_cents: order.item_total_cents(),
            line_items,
            changes: changes.clone(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[async_trait]
pub trait PlacementNotifier: Send + Sync {
    async fn send_placement(&self, notification: &PlacementNotification) -> Result<()>;
}
