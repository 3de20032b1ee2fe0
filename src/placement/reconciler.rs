use std::sync::Arc;
use anyhow::Result;
use uuid::Uuid;

use crate::domain::order::{OrderCommandHandler, QuantityCap, QuantityChanges};
use crate::inventory::{sellable, StockLevels};

/// Caps line item quantities at the stock on hand.
pub struct StockReconciler {
    orders: Arc<OrderCommandHandler>,
    stock: Arc<dyn StockLevels>,
}

impl StockReconciler {
    pub fn new(orders: Arc<OrderCommandHandler>, stock: Arc<dyn StockLevels>) -> Self {
        Self { orders, stock }
    }

    /// Lower every line item asking for more than is available and return
    /// the quantities they had before. Running it again with unchanged stock
    /// returns an empty record and writes nothing.
    pub async fn reconcile(&self, order_id: Uuid, correlation_id: Uuid) -> Result<QuantityChanges> {
        let order = self.orders.load(order_id).await?;

        let mut changes = QuantityChanges::new();
        let mut caps = Vec::new();
        for item in &order.line_items {
            let available = sellable(self.stock.available_quantity(item.variant_id).await?);
            if item.quantity > available {
                changes.record(item.id, item.quantity);
                caps.push(QuantityCap {
                    line_item_id: item.id,
                    quantity: available,
                });
            }
        }

        if caps.is_empty() {
            return Ok(changes);
        }

        self.orders.cap_quantities(order_id, caps, correlation_id).await?;

        tracing::info!(
            order_id = %order_id,
            order_number = %order.number,
            capped = changes.len(),
            "Capped line items at available stock"
        );

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::order::{LineItem, OrderCommand, StandardCheckoutRules};
    use crate::event_sourcing::EventStore;
    use crate::inventory::InMemoryStock;

    struct Fixture {
        orders: Arc<OrderCommandHandler>,
        stock: Arc<InMemoryStock>,
        reconciler: StockReconciler,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(OrderCommandHandler::new(
            Arc::new(EventStore::new("Order")),
            Arc::new(StandardCheckoutRules),
        ));
        let stock = Arc::new(InMemoryStock::new());
        let reconciler = StockReconciler::new(orders.clone(), stock.clone());
        Fixture { orders, stock, reconciler }
    }

    async fn create_order(orders: &OrderCommandHandler, line_items: Vec<LineItem>) -> Uuid {
        let order_id = Uuid::new_v4();
        orders
            .handle(
                order_id,
                OrderCommand::CreateOrder {
                    email: "buyer@example.com".to_string(),
                    standing_order_id: None,
                    line_items,
                    ship_address: None,
                    payment_method: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        order_id
    }

    #[tokio::test]
    async fn test_caps_short_lines_and_records_original() {
        let f = fixture();
        let short = LineItem::new(Uuid::new_v4(), 5, 100);
        let plenty = LineItem::new(Uuid::new_v4(), 2, 100);
        let (short_id, plenty_id) = (short.id, plenty.id);
        f.stock.set(short.variant_id, 3).await;
        f.stock.set(plenty.variant_id, 50).await;
        let order_id = create_order(&f.orders, vec![short, plenty]).await;

        let changes = f.reconciler.reconcile(order_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes.original_quantity(&short_id), Some(5));
        let order = f.orders.load(order_id).await.unwrap();
        assert_eq!(order.line_item(short_id).unwrap().quantity, 3);
        assert_eq!(order.line_item(plenty_id).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_second_run_is_empty() {
        let f = fixture();
        let item = LineItem::new(Uuid::new_v4(), 5, 100);
        f.stock.set(item.variant_id, 3).await;
        let order_id = create_order(&f.orders, vec![item]).await;

        let first = f.reconciler.reconcile(order_id, Uuid::new_v4()).await.unwrap();
        let version = f.orders.load(order_id).await.unwrap().version;
        let second = f.reconciler.reconcile(order_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(f.orders.load(order_id).await.unwrap().version, version);
    }

    #[tokio::test]
    async fn test_missing_and_negative_stock_cap_to_zero() {
        let f = fixture();
        let untracked = LineItem::new(Uuid::new_v4(), 2, 100);
        let oversold = LineItem::new(Uuid::new_v4(), 4, 100);
        let (untracked_id, oversold_id) = (untracked.id, oversold.id);
        f.stock.set(oversold.variant_id, -6).await;
        let order_id = create_order(&f.orders, vec![untracked, oversold]).await;

        let changes = f.reconciler.reconcile(order_id, Uuid::new_v4()).await.unwrap();

        assert_eq!(changes.len(), 2);
        let order = f.orders.load(order_id).await.unwrap();
        assert_eq!(order.line_item(untracked_id).unwrap().quantity, 0);
        assert_eq!(order.line_item(oversold_id).unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_never_increases_quantity() {
        let f = fixture();
        let item = LineItem::new(Uuid::new_v4(), 2, 100);
        let item_id = item.id;
        f.stock.set(item.variant_id, 100).await;
        let order_id = create_order(&f.orders, vec![item]).await;

        let changes = f.reconciler.reconcile(order_id, Uuid::new_v4()).await.unwrap();

        assert!(changes.is_empty());
        assert_eq!(f.orders.load(order_id).await.unwrap().line_item(item_id).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_stock_query_failure_propagates_without_writes() {
        struct Unreachable;

        #[async_trait]
        impl StockLevels for Unreachable {
            async fn available_quantity(&self, _variant_id: Uuid) -> Result<Option<i64>> {
                anyhow::bail!("inventory service unreachable")
            }
        }

        let orders = Arc::new(OrderCommandHandler::new(
            Arc::new(EventStore::new("Order")),
            Arc::new(StandardCheckoutRules),
        ));
        let reconciler = StockReconciler::new(orders.clone(), Arc::new(Unreachable));
        let order_id = create_order(&orders, vec![LineItem::new(Uuid::new_v4(), 5, 100)]).await;

        let err = reconciler.reconcile(order_id, Uuid::new_v4()).await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
        assert_eq!(orders.load(order_id).await.unwrap().version, 1);
    }
}
