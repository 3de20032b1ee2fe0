use uuid::Uuid;
use super::value_objects::{LineItem, OrderState, PaymentMethodRef, ShipAddress};

// ============================================================================
// Order Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityCap {
    pub line_item_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub enum OrderCommand {
    CreateOrder {
        email: String,
        standing_order_id: Option<Uuid>,
        line_items: Vec<LineItem>,
        ship_address: Option<ShipAddress>,
        payment_method: Option<PaymentMethodRef>,
    },
    /// Lower several line items in one atomic append
    CapQuantities {
        caps: Vec<QuantityCap>,
    },
    /// Move to `next`, already approved by the checkout rules
    AdvanceTo {
        next: OrderState,
    },
}
