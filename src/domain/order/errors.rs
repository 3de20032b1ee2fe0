use std::fmt;
use uuid::Uuid;
use super::value_objects::OrderState;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order is already complete")]
    AlreadyComplete,

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderState, to: OrderState },

    #[error("Line item not found: {0}")]
    LineItemNotFound(Uuid),

    #[error("Capping line item {line_item_id} would raise quantity from {current} to {requested}")]
    QuantityIncrease {
        line_item_id: Uuid,
        current: u32,
        requested: u32,
    },

    #[error("Order email cannot be empty")]
    EmptyEmail,

    #[error("Order already exists")]
    AlreadyCreated,

    #[error("Aggregate not initialized")]
    NotInitialized,
}

/// Human-readable messages explaining why a checkout step was refused
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new(messages: Vec<String>) -> Self {
        Self(messages)
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}
