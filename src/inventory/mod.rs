use std::collections::HashMap;
use async_trait::async_trait;
use anyhow::Result;
use tokio::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Stock Levels
// ============================================================================
//
// How availability is computed is owned by the inventory service. The
// placement job only asks "how many of this variant can be sold right now".
//
// ============================================================================

#[async_trait]
pub trait StockLevels: Send + Sync {
    /// `None` when the variant has no stock record at all
    async fn available_quantity(&self, variant_id: Uuid) -> Result<Option<i64>>;
}

/// Clamp a raw availability answer to a sellable quantity.
/// Missing and negative values both mean nothing can be sold.
pub fn sellable(available: Option<i64>) -> u32 {
    match available {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 0,
    }
}

/// Stock table kept in memory; used by the demo binary and tests.
#[derive(Default)]
pub struct InMemoryStock {
    levels: RwLock<HashMap<Uuid, i64>>,
}

impl InMemoryStock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, variant_id: Uuid, on_hand: i64) {
        self.levels.write().await.insert(variant_id, on_hand);
    }

    pub async fn remove(&self, variant_id: Uuid) {
        self.levels.write().await.remove(&variant_id);
    }
}

#[async_trait]
impl StockLevels for InMemoryStock {
    async fn available_quantity(&self, variant_id: Uuid) -> Result<Option<i64>> {
        Ok(self.levels.read().await.get(&variant_id).copied())
    }
}
