use uuid::Uuid;
use super::value_objects::OrderCycleId;

// ============================================================================
// Standing Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StandingOrderError {
    #[error("Standing order not found: {0}")]
    StandingOrderNotFound(Uuid),

    #[error("Proxy order not found: {0}")]
    ProxyOrderNotFound(Uuid),

    #[error("Standing order {standing_order_id} already has a proxy order for cycle {order_cycle_id}")]
    DuplicateProxyOrder {
        standing_order_id: Uuid,
        order_cycle_id: OrderCycleId,
    },

    #[error("Standing order {0} has no line items to order")]
    EmptyTemplate(Uuid),
}
