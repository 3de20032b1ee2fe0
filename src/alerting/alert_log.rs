use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{AlertKind, AlertSink, OperationalAlert};

// ============================================================================
// Alert Log
// ============================================================================
//
// Keeps the most recent alerts for manual intervention:
// - bounded, oldest dropped first
// - queryable by operators (recent, stats)
// - lifetime counts survive eviction
//
// ============================================================================

pub struct AlertLog {
    capacity: usize,
    inner: Mutex<AlertLogState>,
}

#[derive(Default)]
struct AlertLogState {
    alerts: VecDeque<OperationalAlert>,
    total: u64,
    by_kind: HashMap<AlertKind, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertStats {
    pub total: u64,
    pub by_kind: HashMap<AlertKind, u64>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(AlertLogState::default()),
        }
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<OperationalAlert> {
        match self.inner.lock() {
            Ok(state) => state.alerts.iter().rev().take(limit).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn stats(&self) -> AlertStats {
        match self.inner.lock() {
            Ok(state) => AlertStats {
                total: state.total,
                by_kind: state.by_kind.clone(),
            },
            Err(_) => AlertStats::default(),
        }
    }

    pub fn for_order(&self, order_number: &str) -> Vec<OperationalAlert> {
        match self.inner.lock() {
            Ok(state) => state
                .alerts
                .iter()
                .filter(|alert| alert.order_number.as_deref() == Some(order_number))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl AlertSink for AlertLog {
    fn raise(&self, alert: &OperationalAlert) {
        let Ok(mut state) = self.inner.lock() else {
            tracing::warn!("Alert log poisoned, dropping alert");
            return;
        };

        if state.alerts.len() == self.capacity {
            state.alerts.pop_front();
        }
        state.alerts.push_back(alert.clone());
        state.total += 1;
        *state.by_kind.entry(alert.kind).or_insert(0) += 1;
    }
}
