use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub quantity: u32,
    pub price_cents: i64,
}

impl LineItem {
    pub fn new(variant_id: Uuid, quantity: u32, price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant_id,
            quantity,
            price_cents,
        }
    }

    pub fn total_cents(&self) -> i64 {
        self.price_cents * i64::from(self.quantity)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShipAddress {
    pub recipient: String,
    pub line1: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaymentMethodRef {
    pub id: Uuid,
    pub name: String,
}

/// Checkout state of an order. The chain is linear and finite:
/// Cart → Address → Delivery → Payment → Confirm → Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Cart,
    Address,
    Delivery,
    Payment,
    Confirm,
    Complete,
}

impl OrderState {
    pub fn successor(self) -> Option<OrderState> {
        match self {
            OrderState::Cart => Some(OrderState::Address),
            OrderState::Address => Some(OrderState::Delivery),
            OrderState::Delivery => Some(OrderState::Payment),
            OrderState::Payment => Some(OrderState::Confirm),
            OrderState::Confirm => Some(OrderState::Complete),
            OrderState::Complete => None,
        }
    }

    pub fn is_complete(self) -> bool {
        matches!(self, OrderState::Complete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Cart => "cart",
            OrderState::Address => "address",
            OrderState::Delivery => "delivery",
            OrderState::Payment => "payment",
            OrderState::Confirm => "confirm",
            OrderState::Complete => "complete",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line item id → quantity before capping. Only items whose quantity
/// actually went down appear here.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct QuantityChanges(BTreeMap<Uuid, u32>);

impl QuantityChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line_item_id: Uuid, original_quantity: u32) {
        self.0.insert(line_item_id, original_quantity);
    }

    pub fn original_quantity(&self, line_item_id: &Uuid) -> Option<u32> {
        self.0.get(line_item_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(Uuid, u32)> for QuantityChanges {
    fn from_iter<T: IntoIterator<Item = (Uuid, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Issues Spree-style order numbers ("R" followed by at least nine digits)
/// from a monotonic sequence. Handlers writing to the same store must share
/// one issuer.
#[derive(Debug, Default)]
pub struct OrderNumbers {
    issued: AtomicU64,
}

impl OrderNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after `last_issued`, e.g. the highest number already stored
    pub fn resume_after(last_issued: u64) -> Self {
        Self {
            issued: AtomicU64::new(last_issued),
        }
    }

    pub fn issue(&self) -> String {
        let sequence = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        format!("R{:09}", sequence)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_chain_ends_at_complete() {
        let mut state = OrderState::Cart;
        let mut steps = 0;
        while let Some(next) = state.successor() {
            state = next;
            steps += 1;
        }
        assert_eq!(state, OrderState::Complete);
        assert_eq!(steps, 5);
        assert!(state.is_complete());
    }

    #[test]
    fn test_order_state_serializes_snake_case() {
        let json = serde_json::to_string(&OrderState::Delivery).unwrap();
        assert_eq!(json, "\"delivery\"");
        assert_eq!(OrderState::Payment.to_string(), "payment");
    }

    #[test]
    fn test_line_item_total() {
        let item = LineItem::new(Uuid::new_v4(), 3, 250);
        assert_eq!(item.total_cents(), 750);
    }

    #[test]
    fn test_quantity_changes_serialize_as_map() {
        let id = Uuid::new_v4();
        let changes: QuantityChanges = [(id, 5)].into_iter().collect();

        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json[id.to_string()], 5);
        assert_eq!(changes.original_quantity(&id), Some(5));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_order_number_shape() {
        let number = OrderNumbers::new().issue();
        assert_eq!(number, "R000000001");
        assert_eq!(OrderNumbers::resume_after(41).issue(), "R000000042");
    }

    #[test]
    fn test_order_numbers_unique_across_threads() {
        let numbers = std::sync::Arc::new(OrderNumbers::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let numbers = numbers.clone();
                std::thread::spawn(move || (0..25_000).map(|_| numbers.issue()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        for worker in workers {
            for number in worker.join().unwrap() {
                assert!(seen.insert(number), "order number issued twice");
            }
        }
        assert_eq!(seen.len(), 200_000);
    }
}
