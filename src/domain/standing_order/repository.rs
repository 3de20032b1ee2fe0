use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use anyhow::Result;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::{LineItem, OrderCommand, OrderCommandHandler};
use super::errors::StandingOrderError;
use super::value_objects::{OrderCycleId, ProxyOrder, StandingOrder, StandingOrderStatus};

// ============================================================================
// Proxy Order Repository
// ============================================================================
//
// Read side used by the placement job: which proxy orders are due for a
// cycle, and the idempotent "make sure this proxy order has a draft order"
// step.
//
// ============================================================================

#[async_trait]
pub trait ProxyOrderRepository: Send + Sync {
    /// Non-cancelled proxy orders of active standing orders in `order_cycle_id`
    async fn due_for_placement(&self, order_cycle_id: OrderCycleId) -> Result<Vec<ProxyOrder>>;

    /// Returns the proxy order's order id, materializing a cart order from
    /// the standing order template on first call.
    async fn initialise_order(&self, proxy_order: &ProxyOrder, correlation_id: Uuid) -> Result<Uuid>;
}

/// In-process repository backed by the order event store.
pub struct InMemoryProxyOrderRepository {
    standing_orders: RwLock<HashMap<Uuid, StandingOrder>>,
    proxy_orders: RwLock<HashMap<Uuid, ProxyOrder>>,
    orders: Arc<OrderCommandHandler>,
}

impl InMemoryProxyOrderRepository {
    pub fn new(orders: Arc<OrderCommandHandler>) -> Self {
        Self {
            standing_orders: RwLock::new(HashMap::new()),
            proxy_orders: RwLock::new(HashMap::new()),
            orders,
        }
    }

    pub async fn add_standing_order(&self, standing_order: StandingOrder) {
        self.standing_orders
            .write()
            .await
            .insert(standing_order.id, standing_order);
    }

    pub async fn set_status(&self, standing_order_id: Uuid, status: StandingOrderStatus) -> Result<()> {
        let mut standing_orders = self.standing_orders.write().await;
        let standing_order = standing_orders
            .get_mut(&standing_order_id)
            .ok_or(StandingOrderError::StandingOrderNotFound(standing_order_id))?;
        standing_order.status = status;
        Ok(())
    }

    /// Enforces one proxy order per (standing order, cycle)
    pub async fn add_proxy_order(&self, proxy_order: ProxyOrder) -> Result<()> {
        if !self.standing_orders.read().await.contains_key(&proxy_order.standing_order_id) {
            return Err(StandingOrderError::StandingOrderNotFound(proxy_order.standing_order_id).into());
        }

        let mut proxy_orders = self.proxy_orders.write().await;
        let duplicate = proxy_orders.values().any(|existing| {
            existing.standing_order_id == proxy_order.standing_order_id
                && existing.order_cycle_id == proxy_order.order_cycle_id
        });
        if duplicate {
            return Err(StandingOrderError::DuplicateProxyOrder {
                standing_order_id: proxy_order.standing_order_id,
                order_cycle_id: proxy_order.order_cycle_id,
            }
            .into());
        }

        proxy_orders.insert(proxy_order.id, proxy_order);
        Ok(())
    }

    pub async fn cancel_proxy_order(&self, proxy_order_id: Uuid) -> Result<()> {
        let mut proxy_orders = self.proxy_orders.write().await;
        let proxy_order = proxy_orders
            .get_mut(&proxy_order_id)
            .ok_or(StandingOrderError::ProxyOrderNotFound(proxy_order_id))?;
        proxy_order.canceled_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    pub async fn proxy_order(&self, proxy_order_id: Uuid) -> Option<ProxyOrder> {
        self.proxy_orders.read().await.get(&proxy_order_id).cloned()
    }
}

#[async_trait]
impl ProxyOrderRepository for InMemoryProxyOrderRepository {
    async fn due_for_placement(&self, order_cycle_id: OrderCycleId) -> Result<Vec<ProxyOrder>> {
        let standing_orders = self.standing_orders.read().await;
        let proxy_orders = self.proxy_orders.read().await;

        let mut due: Vec<ProxyOrder> = proxy_orders
            .values()
            .filter(|proxy| {
                standing_orders
                    .get(&proxy.standing_order_id)
                    .is_some_and(|standing| proxy.is_due(standing, order_cycle_id))
            })
            .cloned()
            .collect();
        due.sort_by_key(|proxy| proxy.id);

        Ok(due)
    }

    async fn initialise_order(&self, proxy_order: &ProxyOrder, correlation_id: Uuid) -> Result<Uuid> {
        // Write lock held across creation so two callers cannot both
        // materialize an order for the same proxy order.
        let mut proxy_orders = self.proxy_orders.write().await;
        let stored = proxy_orders
            .get_mut(&proxy_order.id)
            .ok_or(StandingOrderError::ProxyOrderNotFound(proxy_order.id))?;

        if let Some(order_id) = stored.order_id {
            return Ok(order_id);
        }

        let standing_order = self
            .standing_orders
            .read()
            .await
            .get(&stored.standing_order_id)
            .cloned()
            .ok_or(StandingOrderError::StandingOrderNotFound(stored.standing_order_id))?;

        if standing_order.template.is_empty() {
            return Err(StandingOrderError::EmptyTemplate(standing_order.id).into());
        }

        let order_id = Uuid::new_v4();
        let line_items = standing_order
            .template
            .iter()
            .map(|line| LineItem::new(line.variant_id, line.quantity, line.price_cents))
            .collect();

        self.orders
            .handle(
                order_id,
                OrderCommand::CreateOrder {
                    email: standing_order.customer_email.clone(),
                    standing_order_id: Some(standing_order.id),
                    line_items,
                    ship_address: standing_order.ship_address.clone(),
                    payment_method: standing_order.payment_method.clone(),
                },
                correlation_id,
            )
            .await?;

        stored.order_id = Some(order_id);

        tracing::info!(
            proxy_order_id = %stored.id,
            standing_order_id = %standing_order.id,
            order_id = %order_id,
            "Initialised order for proxy order"
        );

        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderState, StandardCheckoutRules};
    use crate::domain::standing_order::TemplateLineItem;
    use crate::event_sourcing::EventStore;

    fn repository() -> InMemoryProxyOrderRepository {
        let handler = OrderCommandHandler::new(
            Arc::new(EventStore::new("Order")),
            Arc::new(StandardCheckoutRules),
        );
        InMemoryProxyOrderRepository::new(Arc::new(handler))
    }

    fn standing_order(status: StandingOrderStatus) -> StandingOrder {
        StandingOrder {
            id: Uuid::new_v4(),
            customer_email: "buyer@example.com".to_string(),
            status,
            template: vec![TemplateLineItem {
                variant_id: Uuid::new_v4(),
                quantity: 4,
                price_cents: 300,
            }],
            ship_address: None,
            payment_method: None,
        }
    }

    #[tokio::test]
    async fn test_selection_filters_status_cycle_and_cancellation() {
        let repo = repository();
        let cycle = OrderCycleId::new();
        let other_cycle = OrderCycleId::new();

        let active = standing_order(StandingOrderStatus::Active);
        let inactive = standing_order(StandingOrderStatus::Inactive);
        let cancelled_owner = standing_order(StandingOrderStatus::Active);
        repo.add_standing_order(active.clone()).await;
        repo.add_standing_order(inactive.clone()).await;
        repo.add_standing_order(cancelled_owner.clone()).await;

        let due = ProxyOrder::new(active.id, cycle);
        let due_id = due.id;
        repo.add_proxy_order(due).await.unwrap();
        repo.add_proxy_order(ProxyOrder::new(active.id, other_cycle)).await.unwrap();
        repo.add_proxy_order(ProxyOrder::new(inactive.id, cycle)).await.unwrap();
        let cancelled = ProxyOrder::new(cancelled_owner.id, cycle);
        let cancelled_id = cancelled.id;
        repo.add_proxy_order(cancelled).await.unwrap();
        repo.cancel_proxy_order(cancelled_id).await.unwrap();

        let selected = repo.due_for_placement(cycle).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, due_id);
    }

    #[tokio::test]
    async fn test_duplicate_proxy_order_rejected() {
        let repo = repository();
        let cycle = OrderCycleId::new();
        let standing = standing_order(StandingOrderStatus::Active);
        repo.add_standing_order(standing.clone()).await;

        repo.add_proxy_order(ProxyOrder::new(standing.id, cycle)).await.unwrap();
        let err = repo.add_proxy_order(ProxyOrder::new(standing.id, cycle)).await.unwrap_err();
        assert!(err.to_string().contains("already has a proxy order"));
    }

    #[tokio::test]
    async fn test_initialise_order_is_idempotent() {
        let repo = repository();
        let cycle = OrderCycleId::new();
        let standing = standing_order(StandingOrderStatus::Active);
        repo.add_standing_order(standing.clone()).await;
        let proxy = ProxyOrder::new(standing.id, cycle);
        repo.add_proxy_order(proxy.clone()).await.unwrap();

        let first = repo.initialise_order(&proxy, Uuid::new_v4()).await.unwrap();
        let second = repo.initialise_order(&proxy, Uuid::new_v4()).await.unwrap();
        assert_eq!(first, second);

        let order = repo.orders.load(first).await.unwrap();
        assert_eq!(order.state, OrderState::Cart);
        assert_eq!(order.standing_order_id, Some(standing.id));
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].quantity, 4);
        assert_eq!(repo.proxy_order(proxy.id).await.unwrap().order_id, Some(first));
    }

    #[tokio::test]
    async fn test_initialise_unknown_proxy_order_fails() {
        let repo = repository();
        let proxy = ProxyOrder::new(Uuid::new_v4(), OrderCycleId::new());
        assert!(repo.initialise_order(&proxy, Uuid::new_v4()).await.is_err());
    }
}
