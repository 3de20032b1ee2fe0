use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::event_sourcing::Aggregate;
use super::value_objects::{LineItem, OrderState, PaymentMethodRef, ShipAddress};
use super::events::*;
use super::commands::OrderCommand;
use super::errors::OrderError;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    // Identity
    pub id: Uuid,
    pub version: i64,
    pub number: String,

    // Current State (derived from events)
    pub email: String,
    pub standing_order_id: Option<Uuid>,
    pub line_items: Vec<LineItem>,
    pub state: OrderState,
    pub ship_address: Option<ShipAddress>,
    pub payment_method: Option<PaymentMethodRef>,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OrderAggregate {
    /// Validate a creation command; there is no aggregate to call
    /// `handle_command` on yet. `number` comes from the handler's issuer.
    pub fn create(number: String, command: &OrderCommand) -> Result<Vec<OrderEvent>, OrderError> {
        match command {
            OrderCommand::CreateOrder {
                email,
                standing_order_id,
                line_items,
                ship_address,
                payment_method,
            } => {
                if email.trim().is_empty() {
                    return Err(OrderError::EmptyEmail);
                }

                Ok(vec![OrderEvent::Created(OrderCreated {
                    number,
                    email: email.clone(),
                    standing_order_id: *standing_order_id,
                    line_items: line_items.clone(),
                    ship_address: ship_address.clone(),
                    payment_method: payment_method.clone(),
                })])
            }
            _ => Err(OrderError::NotInitialized),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn line_item(&self, line_item_id: Uuid) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.id == line_item_id)
    }

    pub fn item_total_cents(&self) -> i64 {
        self.line_items.iter().map(LineItem::total_cents).sum()
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(aggregate_id: Uuid, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Created(e) => {
                let now = Utc::now();
                Ok(Self {
                    id: aggregate_id,
                    version: 0,
                    number: e.number.clone(),
                    email: e.email.clone(),
                    standing_order_id: e.standing_order_id,
                    line_items: e.line_items.clone(),
                    state: OrderState::Cart,
                    ship_address: e.ship_address.clone(),
                    payment_method: e.payment_method.clone(),
                    created_at: now,
                    updated_at: now,
                    completed_at: None,
                })
            }
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        self.updated_at = Utc::now();

        match event {
            OrderEvent::Created(_) => Ok(()),
            OrderEvent::LineItemQuantityCapped(e) => {
                let item = self
                    .line_items
                    .iter_mut()
                    .find(|item| item.id == e.line_item_id)
                    .ok_or(OrderError::LineItemNotFound(e.line_item_id))?;
                item.quantity = e.to_quantity;
                Ok(())
            }
            OrderEvent::StateAdvanced(e) => {
                self.state = e.to;
                if e.to.is_complete() {
                    self.completed_at = Some(e.advanced_at);
                }
                Ok(())
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateOrder { .. } => Err(OrderError::AlreadyCreated),

            OrderCommand::CapQuantities { caps } => {
                if self.is_complete() {
                    return Err(OrderError::AlreadyComplete);
                }

                let mut events = Vec::with_capacity(caps.len());
                for cap in caps {
                    let item = self
                        .line_item(cap.line_item_id)
                        .ok_or(OrderError::LineItemNotFound(cap.line_item_id))?;

                    if cap.quantity > item.quantity {
                        return Err(OrderError::QuantityIncrease {
                            line_item_id: item.id,
                            current: item.quantity,
                            requested: cap.quantity,
                        });
                    }
                    if cap.quantity == item.quantity {
                        continue;
                    }

                    events.push(OrderEvent::LineItemQuantityCapped(LineItemQuantityCapped {
                        line_item_id: item.id,
                        variant_id: item.variant_id,
                        from_quantity: item.quantity,
                        to_quantity: cap.quantity,
                    }));
                }

                Ok(events)
            }

            OrderCommand::AdvanceTo { next } => {
                if self.is_complete() {
                    return Err(OrderError::AlreadyComplete);
                }
                if self.state.successor() != Some(*next) {
                    return Err(OrderError::InvalidTransition {
                        from: self.state,
                        to: *next,
                    });
                }

                Ok(vec![OrderEvent::StateAdvanced(OrderStateAdvanced {
                    from: self.state,
                    to: *next,
                    advanced_at: Utc::now(),
                })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::QuantityCap;
    use crate::event_sourcing::EventEnvelope;

    fn create_command(line_items: Vec<LineItem>) -> OrderCommand {
        OrderCommand::CreateOrder {
            email: "buyer@example.com".to_string(),
            standing_order_id: Some(Uuid::new_v4()),
            line_items,
            ship_address: None,
            payment_method: None,
        }
    }

    fn new_order(line_items: Vec<LineItem>) -> OrderAggregate {
        let id = Uuid::new_v4();
        let events = OrderAggregate::create("R000000007".to_string(), &create_command(line_items)).unwrap();
        OrderAggregate::apply_first_event(id, &events[0]).unwrap()
    }

    fn apply_all(order: &mut OrderAggregate, events: Vec<OrderEvent>) {
        for event in events {
            order.apply_event(&event).unwrap();
        }
    }

    #[test]
    fn test_create_starts_in_cart() {
        let order = new_order(vec![LineItem::new(Uuid::new_v4(), 2, 100)]);
        assert_eq!(order.state, OrderState::Cart);
        assert_eq!(order.number, "R000000007");
        assert!(!order.is_complete());
        assert_eq!(order.item_total_cents(), 200);
    }

    #[test]
    fn test_create_rejects_blank_email() {
        let command = OrderCommand::CreateOrder {
            email: "  ".to_string(),
            standing_order_id: None,
            line_items: vec![],
            ship_address: None,
            payment_method: None,
        };
        assert!(matches!(
            OrderAggregate::create("R000000001".to_string(), &command),
            Err(OrderError::EmptyEmail)
        ));
    }

    #[test]
    fn test_cap_lowers_quantity() {
        let item = LineItem::new(Uuid::new_v4(), 5, 100);
        let item_id = item.id;
        let mut order = new_order(vec![item]);

        let events = order
            .handle_command(&OrderCommand::CapQuantities {
                caps: vec![QuantityCap { line_item_id: item_id, quantity: 3 }],
            })
            .unwrap();
        assert_eq!(events.len(), 1);

        apply_all(&mut order, events);
        assert_eq!(order.line_item(item_id).unwrap().quantity, 3);
    }

    #[test]
    fn test_cap_to_same_quantity_emits_nothing() {
        let item = LineItem::new(Uuid::new_v4(), 4, 100);
        let item_id = item.id;
        let order = new_order(vec![item]);

        let events = order
            .handle_command(&OrderCommand::CapQuantities {
                caps: vec![QuantityCap { line_item_id: item_id, quantity: 4 }],
            })
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_cap_never_increases() {
        let item = LineItem::new(Uuid::new_v4(), 2, 100);
        let item_id = item.id;
        let order = new_order(vec![item]);

        let result = order.handle_command(&OrderCommand::CapQuantities {
            caps: vec![QuantityCap { line_item_id: item_id, quantity: 7 }],
        });
        assert!(matches!(result, Err(OrderError::QuantityIncrease { current: 2, requested: 7, .. })));
    }

    #[test]
    fn test_cap_unknown_line_item() {
        let order = new_order(vec![LineItem::new(Uuid::new_v4(), 2, 100)]);
        let result = order.handle_command(&OrderCommand::CapQuantities {
            caps: vec![QuantityCap { line_item_id: Uuid::new_v4(), quantity: 0 }],
        });
        assert!(matches!(result, Err(OrderError::LineItemNotFound(_))));
    }

    #[test]
    fn test_advance_only_to_successor() {
        let order = new_order(vec![]);

        let skip = order.handle_command(&OrderCommand::AdvanceTo { next: OrderState::Payment });
        assert!(matches!(
            skip,
            Err(OrderError::InvalidTransition { from: OrderState::Cart, to: OrderState::Payment })
        ));

        let events = order
            .handle_command(&OrderCommand::AdvanceTo { next: OrderState::Address })
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_complete_order_is_frozen() {
        let mut order = new_order(vec![LineItem::new(Uuid::new_v4(), 1, 100)]);
        while let Some(next) = order.state.successor() {
            let events = order.handle_command(&OrderCommand::AdvanceTo { next }).unwrap();
            apply_all(&mut order, events);
        }

        assert!(order.is_complete());
        assert!(order.completed_at.is_some());
        assert!(matches!(
            order.handle_command(&OrderCommand::AdvanceTo { next: OrderState::Complete }),
            Err(OrderError::AlreadyComplete)
        ));
        assert!(matches!(
            order.handle_command(&OrderCommand::CapQuantities { caps: vec![] }),
            Err(OrderError::AlreadyComplete)
        ));
    }

    #[test]
    fn test_apply_first_event_non_created_fails() {
        let event = OrderEvent::StateAdvanced(OrderStateAdvanced {
            from: OrderState::Cart,
            to: OrderState::Address,
            advanced_at: Utc::now(),
        });
        let result = OrderAggregate::apply_first_event(Uuid::new_v4(), &event);
        assert!(matches!(result, Err(OrderError::NotInitialized)));
    }

    #[test]
    fn test_load_from_events_full_lifecycle() {
        let order_id = Uuid::new_v4();
        let item = LineItem::new(Uuid::new_v4(), 6, 100);
        let item_id = item.id;
        let created = OrderAggregate::create("R000000001".to_string(), &create_command(vec![item]))
            .unwrap()
            .remove(0);

        let events = vec![
            EventEnvelope::new(order_id, 1, "OrderCreated".to_string(), created, Uuid::new_v4()),
            EventEnvelope::new(
                order_id,
                2,
                "LineItemQuantityCapped".to_string(),
                OrderEvent::LineItemQuantityCapped(LineItemQuantityCapped {
                    line_item_id: item_id,
                    variant_id: Uuid::new_v4(),
                    from_quantity: 6,
                    to_quantity: 1,
                }),
                Uuid::new_v4(),
            ),
            EventEnvelope::new(
                order_id,
                3,
                "OrderStateAdvanced".to_string(),
                OrderEvent::StateAdvanced(OrderStateAdvanced {
                    from: OrderState::Cart,
                    to: OrderState::Address,
                    advanced_at: Utc::now(),
                }),
                Uuid::new_v4(),
            ),
        ];

        let order = OrderAggregate::load_from_events(events).unwrap();
        assert_eq!(order.id, order_id);
        assert_eq!(order.version, 3);
        assert_eq!(order.state, OrderState::Address);
        assert_eq!(order.line_item(item_id).unwrap().quantity, 1);
    }
}
