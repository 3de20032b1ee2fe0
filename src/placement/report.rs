use serde::Serialize;
use uuid::Uuid;

use crate::domain::order::{OrderState, QuantityChanges};
use crate::domain::standing_order::OrderCycleId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PlacementResult {
    /// Reached complete; `notified` is false when the notifier failed
    Placed {
        changes: QuantityChanges,
        notified: bool,
    },
    AlreadyComplete,
    /// The checkout refused a step; an alert was raised
    Stuck {
        state: OrderState,
        errors: Vec<String>,
    },
    /// Infrastructure failure inside the unit; an alert was raised
    Failed {
        error: String,
    },
}

impl PlacementResult {
    pub fn label(&self) -> &'static str {
        match self {
            PlacementResult::Placed { .. } => "placed",
            PlacementResult::AlreadyComplete => "already_complete",
            PlacementResult::Stuck { .. } => "stuck",
            PlacementResult::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProxyOrderOutcome {
    pub proxy_order_id: Uuid,
    pub order_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub result: PlacementResult,
}

/// Summary of one placement run, in candidate order
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReport {
    pub order_cycle_id: OrderCycleId,
    pub correlation_id: Uuid,
    pub outcomes: Vec<ProxyOrderOutcome>,
}

impl PlacementReport {
    pub fn new(order_cycle_id: OrderCycleId, correlation_id: Uuid, outcomes: Vec<ProxyOrderOutcome>) -> Self {
        Self {
            order_cycle_id,
            correlation_id,
            outcomes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcome_for(&self, proxy_order_id: Uuid) -> Option<&ProxyOrderOutcome> {
        self.outcomes.iter().find(|o| o.proxy_order_id == proxy_order_id)
    }

    fn count(&self, label: &str) -> usize {
        self.outcomes.iter().filter(|o| o.result.label() == label).count()
    }

    pub fn placed(&self) -> usize {
        self.count("placed")
    }

    pub fn already_complete(&self) -> usize {
        self.count("already_complete")
    }

    pub fn stuck(&self) -> usize {
        self.count("stuck")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }
}
