use std::sync::Arc;
use async_trait::async_trait;
use anyhow::Result;

use crate::metrics::PlacementMetrics;
use crate::utils::{
    retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
    RetryConfig,
};
use super::notification::{PlacementNotification, PlacementNotifier};

/// Wraps a notifier with retry and a circuit breaker, so a flaky mail
/// transport neither stalls the placement run nor gets hammered by it.
pub struct ResilientNotifier {
    inner: Arc<dyn PlacementNotifier>,
    retry: RetryConfig,
    circuit_breaker: CircuitBreaker,
    metrics: Option<Arc<PlacementMetrics>>,
}

impl ResilientNotifier {
    pub fn new(
        inner: Arc<dyn PlacementNotifier>,
        retry: RetryConfig,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            inner,
            retry,
            circuit_breaker: CircuitBreaker::new("placement-notifier", breaker),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PlacementMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state().await
    }

    pub async fn reset_circuit_breaker(&self) {
        self.circuit_breaker.reset().await;
    }
}

#[async_trait]
impl PlacementNotifier for ResilientNotifier {
    async fn send_placement(&self, notification: &PlacementNotification) -> Result<()> {
        let inner = self.inner.clone();
        let retry = &self.retry;

        let result = self
            .circuit_breaker
            .call(async {
                retry_with_backoff(retry, |_attempt| inner.send_placement(notification))
                    .await
                    .into_result()
            })
            .await;

        if let Some(metrics) = &self.metrics {
            metrics.set_notifier_circuit_state(self.circuit_breaker.state().await.code());
        }

        match result {
            Ok(()) => Ok(()),
            Err(CircuitBreakerError::CircuitOpen(name)) => {
                tracing::error!(
                    order_number = %notification.order_number,
                    breaker = %name,
                    "Circuit breaker open - notification not sent"
                );
                Err(anyhow::anyhow!("Circuit breaker '{}' open", name))
            }
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }
}
