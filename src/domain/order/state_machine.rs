use super::aggregate::OrderAggregate;
use super::errors::ValidationErrors;
use super::value_objects::OrderState;

// ============================================================================
// Checkout State Machine
// ============================================================================
//
// The step graph is fixed (OrderState::successor). What may block a step is
// decided by a pluggable CheckoutRules implementation, so the placement job
// never needs to know how payment or shipping validation works.
//
// ============================================================================

/// Business rules guarding each checkout step.
pub trait CheckoutRules: Send + Sync {
    /// Messages blocking the step out of `from`; empty when the step may proceed.
    fn blocking_errors(&self, from: OrderState, order: &OrderAggregate) -> Vec<String>;
}

/// Pure transition function: the next state, or the reasons it was refused.
pub fn transition(
    state: OrderState,
    order: &OrderAggregate,
    rules: &dyn CheckoutRules,
) -> Result<OrderState, ValidationErrors> {
    let Some(next) = state.successor() else {
        return Err(ValidationErrors::single("Order is already complete"));
    };

    let errors = rules.blocking_errors(state, order);
    if errors.is_empty() {
        Ok(next)
    } else {
        Err(ValidationErrors::new(errors))
    }
}

/// Default rules for orders materialized from standing orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCheckoutRules;

impl CheckoutRules for StandardCheckoutRules {
    fn blocking_errors(&self, from: OrderState, order: &OrderAggregate) -> Vec<String> {
        let mut errors = Vec::new();
        match from {
            OrderState::Cart => {
                if !order.line_items.iter().any(|item| item.quantity > 0) {
                    errors.push("There are no items with available stock in this order".to_string());
                }
            }
            OrderState::Address => {
                if order.ship_address.is_none() {
                    errors.push("Ship address can't be blank".to_string());
                }
            }
            OrderState::Payment => {
                if order.payment_method.is_none() {
                    errors.push("No payment method has been selected".to_string());
                }
            }
            OrderState::Delivery | OrderState::Confirm | OrderState::Complete => {}
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{
        LineItem, OrderCommand, PaymentMethodRef, ShipAddress,
    };
    use crate::event_sourcing::Aggregate;
    use uuid::Uuid;

    fn order(quantity: u32, with_address: bool, with_payment: bool) -> OrderAggregate {
        let id = Uuid::new_v4();
        let command = OrderCommand::CreateOrder {
            email: "buyer@example.com".to_string(),
            standing_order_id: None,
            line_items: vec![LineItem::new(Uuid::new_v4(), quantity, 100)],
            ship_address: with_address.then(|| ShipAddress {
                recipient: "Sam Grower".to_string(),
                line1: "1 Orchard Lane".to_string(),
                city: "Hobart".to_string(),
                postcode: "7000".to_string(),
                country: "AU".to_string(),
            }),
            payment_method: with_payment.then(|| PaymentMethodRef {
                id: Uuid::new_v4(),
                name: "Card".to_string(),
            }),
        };
        let events = OrderAggregate::create(id.to_string(), &command).unwrap();
        OrderAggregate::apply_first_event(id, &events[0]).unwrap()
    }

    #[test]
    fn test_transition_moves_to_successor() {
        let order = order(2, true, true);
        let next = transition(OrderState::Cart, &order, &StandardCheckoutRules).unwrap();
        assert_eq!(next, OrderState::Address);
    }

    #[test]
    fn test_complete_has_no_transition() {
        let order = order(2, true, true);
        let errors = transition(OrderState::Complete, &order, &StandardCheckoutRules).unwrap_err();
        assert_eq!(errors.messages(), ["Order is already complete"]);
    }

    #[test]
    fn test_cart_with_only_zero_quantities_is_blocked() {
        let order = order(0, true, true);
        let errors = transition(OrderState::Cart, &order, &StandardCheckoutRules).unwrap_err();
        assert!(errors.to_string().contains("no items with available stock"));
    }

    #[test]
    fn test_missing_address_and_payment_block_their_steps() {
        let order = order(1, false, false);
        assert!(transition(OrderState::Address, &order, &StandardCheckoutRules).is_err());
        assert!(transition(OrderState::Delivery, &order, &StandardCheckoutRules).is_ok());
        assert!(transition(OrderState::Payment, &order, &StandardCheckoutRules).is_err());
    }

    #[test]
    fn test_custom_rules_report_all_messages() {
        struct Picky;
        impl CheckoutRules for Picky {
            fn blocking_errors(&self, from: OrderState, _order: &OrderAggregate) -> Vec<String> {
                if from == OrderState::Confirm {
                    vec!["terms not accepted".to_string(), "age not verified".to_string()]
                } else {
                    vec![]
                }
            }
        }

        let order = order(1, true, true);
        let errors = transition(OrderState::Confirm, &order, &Picky).unwrap_err();
        assert_eq!(errors.messages().len(), 2);
        assert_eq!(errors.to_string(), "terms not accepted; age not verified");
    }
}
