use std::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::domain::order::{PaymentMethodRef, ShipAddress};

// ============================================================================
// Standing Order Value Objects
// ============================================================================

/// Identifier of an order cycle (the recurring sales window)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCycleId(pub Uuid);

impl OrderCycleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderCycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderCycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandingOrderStatus {
    Active,
    Inactive,
}

/// One line of the recurring-purchase template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLineItem {
    pub variant_id: Uuid,
    pub quantity: u32,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingOrder {
    pub id: Uuid,
    pub customer_email: String,
    pub status: StandingOrderStatus,
    pub template: Vec<TemplateLineItem>,
    pub ship_address: Option<ShipAddress>,
    pub payment_method: Option<PaymentMethodRef>,
}

impl StandingOrder {
    pub fn is_active(&self) -> bool {
        self.status == StandingOrderStatus::Active
    }
}

/// Links one standing order, one order cycle and (once initialised) one order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyOrder {
    pub id: Uuid,
    pub standing_order_id: Uuid,
    pub order_cycle_id: OrderCycleId,
    pub order_id: Option<Uuid>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl ProxyOrder {
    pub fn new(standing_order_id: Uuid, order_cycle_id: OrderCycleId) -> Self {
        Self {
            id: Uuid::new_v4(),
            standing_order_id,
            order_cycle_id,
            order_id: None,
            canceled_at: None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// Selection rule for a placement run
    pub fn is_due(&self, standing_order: &StandingOrder, order_cycle_id: OrderCycleId) -> bool {
        !self.is_canceled()
            && self.order_cycle_id == order_cycle_id
            && self.standing_order_id == standing_order.id
            && standing_order.is_active()
    }
}
