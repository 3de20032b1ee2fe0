// ============================================================================
// Operational Alerting
// ============================================================================
//
// Operator-facing signal for orders the placement job gave up on. Raising an
// alert never fails from the caller's point of view; sinks swallow their own
// errors.
//
// ============================================================================

mod alert_log;

use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use alert_log::{AlertLog, AlertStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The checkout state machine refused a step
    CannotAdvance,
    /// Store, stock or initialisation failure inside one order's processing
    ProcessingFailed,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::CannotAdvance => "cannot_advance",
            AlertKind::ProcessingFailed => "processing_failed",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalAlert {
    pub kind: AlertKind,
    pub job_name: String,
    pub error_description: String,
    /// Absent when the failure happened before an order existed
    pub order_number: Option<String>,
    pub validation_errors: Vec<String>,
    pub raised_at: DateTime<Utc>,
}

impl OperationalAlert {
    pub fn new(kind: AlertKind, job_name: impl Into<String>, error_description: impl Into<String>) -> Self {
        Self {
            kind,
            job_name: job_name.into(),
            error_description: error_description.into(),
            order_number: None,
            validation_errors: Vec::new(),
            raised_at: Utc::now(),
        }
    }

    pub fn with_order_number(mut self, order_number: impl Into<String>) -> Self {
        self.order_number = Some(order_number.into());
        self
    }

    pub fn with_validation_errors(mut self, errors: Vec<String>) -> Self {
        self.validation_errors = errors;
        self
    }
}

pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: &OperationalAlert);
}

/// Emits alerts as structured error logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: &OperationalAlert) {
        tracing::error!(
            kind = %alert.kind,
            job = %alert.job_name,
            order_number = alert.order_number.as_deref().unwrap_or("-"),
            errors = ?alert.validation_errors,
            "🚨 {}",
            alert.error_description
        );
    }
}

/// Delivers every alert to each inner sink
pub struct FanoutAlertSink {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl FanoutAlertSink {
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        Self { sinks }
    }
}

impl AlertSink for FanoutAlertSink {
    fn raise(&self, alert: &OperationalAlert) {
        for sink in &self.sinks {
            sink.raise(alert);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_builder() {
        let alert = OperationalAlert::new(AlertKind::CannotAdvance, "StandingOrderPlacement", "Cannot process order due to errors")
            .with_order_number("R000000042")
            .with_validation_errors(vec!["card declined".to_string()]);

        assert_eq!(alert.order_number.as_deref(), Some("R000000042"));
        assert_eq!(alert.validation_errors, vec!["card declined".to_string()]);
        assert_eq!(alert.kind.to_string(), "cannot_advance");
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(AlertLog::new(10));
        let second = Arc::new(AlertLog::new(10));
        let fanout = FanoutAlertSink::new(vec![
            first.clone(),
            second.clone(),
            Arc::new(TracingAlertSink),
        ]);

        fanout.raise(&OperationalAlert::new(AlertKind::ProcessingFailed, "job", "boom"));

        assert_eq!(first.stats().total, 1);
        assert_eq!(second.stats().total, 1);
    }
}
