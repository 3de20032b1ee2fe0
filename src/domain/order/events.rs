use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::DomainEvent;
use super::value_objects::{LineItem, OrderState, PaymentMethodRef, ShipAddress};

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Created(OrderCreated),
    LineItemQuantityCapped(LineItemQuantityCapped),
    StateAdvanced(OrderStateAdvanced),
}

impl DomainEvent for OrderEvent {
    fn event_name(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::LineItemQuantityCapped(_) => "LineItemQuantityCapped",
            OrderEvent::StateAdvanced(_) => "OrderStateAdvanced",
        }
    }
}

/// Order Created - draft order materialized in the cart state
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCreated {
    pub number: String,
    pub email: String,
    pub standing_order_id: Option<Uuid>,
    pub line_items: Vec<LineItem>,
    pub ship_address: Option<ShipAddress>,
    pub payment_method: Option<PaymentMethodRef>,
}

/// Line item reduced to the stock on hand
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LineItemQuantityCapped {
    pub line_item_id: Uuid,
    pub variant_id: Uuid,
    pub from_quantity: u32,
    pub to_quantity: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderStateAdvanced {
    pub from: OrderState,
    pub to: OrderState,
    pub advanced_at: DateTime<Utc>,
}
