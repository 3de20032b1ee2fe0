use std::sync::Arc;
use uuid::Uuid;
use anyhow::Result;

use crate::event_sourcing::{Aggregate, DomainEvent, EventEnvelope, EventStore};

use super::aggregate::OrderAggregate;
use super::commands::{OrderCommand, QuantityCap};
use super::errors::ValidationErrors;
use super::events::OrderEvent;
use super::state_machine::{transition, CheckoutRules};
use super::value_objects::{OrderNumbers, OrderState};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store
//
// ============================================================================

/// Result of one checkout step attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced(OrderState),
    /// Order left unchanged
    Rejected(ValidationErrors),
}

pub struct OrderCommandHandler {
    event_store: Arc<EventStore<OrderEvent>>,
    rules: Arc<dyn CheckoutRules>,
    numbers: Arc<OrderNumbers>,
}

impl OrderCommandHandler {
    pub fn new(event_store: Arc<EventStore<OrderEvent>>, rules: Arc<dyn CheckoutRules>) -> Self {
        Self {
            event_store,
            rules,
            numbers: Arc::new(OrderNumbers::new()),
        }
    }

    /// Share an issuer with other handlers on the same store
    pub fn with_order_numbers(mut self, numbers: Arc<OrderNumbers>) -> Self {
        self.numbers = numbers;
        self
    }

    pub async fn load(&self, order_id: Uuid) -> Result<OrderAggregate> {
        self.event_store.load_aggregate::<OrderAggregate>(order_id).await
    }

    /// Handle a command and persist resulting events
    pub async fn handle(
        &self,
        aggregate_id: Uuid,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<i64> {
        let (expected_version, domain_events) = if self.event_store.aggregate_exists(aggregate_id).await? {
            let aggregate = self.load(aggregate_id).await?;
            let events = aggregate.handle_command(&command)
                .map_err(|e| anyhow::anyhow!("Command failed: {}", e))?;
            (aggregate.version(), events)
        } else {
            let events = OrderAggregate::create(self.numbers.issue(), &command)
                .map_err(|e| anyhow::anyhow!("Command failed for {}: {}", aggregate_id, e))?;
            (0, events)
        };

        if domain_events.is_empty() {
            return Ok(expected_version);
        }

        let mut seq = expected_version;
        let envelopes = domain_events
            .into_iter()
            .map(|domain_event| {
                seq += 1;
                let event_type = domain_event.event_name().to_string();
                EventEnvelope::new(aggregate_id, seq, event_type, domain_event, correlation_id)
            })
            .collect();

        self.event_store
            .append_events(aggregate_id, expected_version, envelopes)
            .await
    }

    pub async fn cap_quantities(
        &self,
        order_id: Uuid,
        caps: Vec<QuantityCap>,
        correlation_id: Uuid,
    ) -> Result<i64> {
        self.handle(order_id, OrderCommand::CapQuantities { caps }, correlation_id).await
    }

    /// Attempt one checkout step. Validation refusals are an outcome, not an
    /// error; only store failures surface as `Err`.
    pub async fn advance(&self, order_id: Uuid, correlation_id: Uuid) -> Result<AdvanceOutcome> {
        let order = self.load(order_id).await?;

        let next = match transition(order.state, &order, self.rules.as_ref()) {
            Ok(next) => next,
            Err(errors) => {
                tracing::debug!(
                    order_id = %order_id,
                    state = %order.state,
                    errors = %errors,
                    "Checkout step refused"
                );
                return Ok(AdvanceOutcome::Rejected(errors));
            }
        };

        self.handle(order_id, OrderCommand::AdvanceTo { next }, correlation_id).await?;

        tracing::debug!(
            order_id = %order_id,
            from = %order.state,
            to = %next,
            "Order advanced"
        );

        Ok(AdvanceOutcome::Advanced(next))
    }
}
