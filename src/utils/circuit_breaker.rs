use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Stops hammering a collaborator that keeps failing.
//
// States:
// - Closed: calls pass through
// - Open: calls rejected until `open_for` has elapsed
// - HalfOpen: one trial call at a time; `success_threshold` successes close it
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0=Closed, 1=Open, 2=HalfOpen
    pub fn code(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker '{0}' is open")]
    CircuitOpen(String),

    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    trial_started_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    state: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                trial_started_at: None,
            })),
            config,
        }
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut state = self.state.lock().await;
            match state.state {
                CircuitState::Closed => {}
                CircuitState::Open => {
                    let elapsed = state.opened_at.map(|at| at.elapsed()).unwrap_or(Duration::MAX);
                    if elapsed < self.config.open_for {
                        return Err(CircuitBreakerError::CircuitOpen(self.name.clone()));
                    }
                    tracing::info!(breaker = %self.name, "Circuit breaker half-open, admitting a trial call");
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                    state.trial_started_at = Some(Instant::now());
                }
                CircuitState::HalfOpen => {
                    // A trial call abandoned for longer than `open_for` no longer blocks
                    let in_flight = state
                        .trial_started_at
                        .is_some_and(|at| at.elapsed() < self.config.open_for);
                    if in_flight {
                        return Err(CircuitBreakerError::CircuitOpen(self.name.clone()));
                    }
                    state.trial_started_at = Some(Instant::now());
                }
            }
        }

        match operation.await {
            Ok(result) => {
                self.record_success().await;
                Ok(result)
            }
            Err(err) => {
                self.record_failure().await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.state.lock().await;
        state.trial_started_at = None;

        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    tracing::info!(breaker = %self.name, "Circuit breaker closed");
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => state.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.trial_started_at = None;
        state.failure_count += 1;

        let should_open = match state.state {
            CircuitState::Closed => state.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if should_open {
            tracing::warn!(
                breaker = %self.name,
                failures = state.failure_count,
                "Circuit breaker opened"
            );
            state.state = CircuitState::Open;
            state.success_count = 0;
            state.opened_at = Some(Instant::now());
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.state = CircuitState::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.opened_at = None;
        state.trial_started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_opens_after_threshold_and_rejects() {
        let cb = CircuitBreaker::new("mailer", CircuitBreakerConfig {
            failure_threshold: 3,
            open_for: Duration::from_secs(60),
            success_threshold: 1,
        });

        for _ in 0..3 {
            assert!(cb.call(async { Err::<(), _>("error") }).await.is_err());
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen(name)) if name == "mailer"));
    }

    #[tokio::test]
    async fn test_half_open_success_closes() {
        let cb = CircuitBreaker::new("mailer", CircuitBreakerConfig {
            failure_threshold: 1,
            open_for: Duration::from_millis(20),
            success_threshold: 1,
        });

        let _ = cb.call(async { Err::<(), _>("error") }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cb.call(async { Ok::<_, &str>(()) }).await.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_admits_one_trial_call() {
        let cb = CircuitBreaker::new("mailer", CircuitBreakerConfig {
            failure_threshold: 1,
            open_for: Duration::from_millis(200),
            success_threshold: 2,
        });
        let _ = cb.call(async { Err::<(), _>("error") }).await;
        tokio::time::sleep(Duration::from_millis(250)).await;

        let (release, released) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.call(async {
                    let _ = released.await;
                    Ok::<_, &str>(())
                })
                .await
                .is_ok()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let concurrent = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(concurrent, Err(CircuitBreakerError::CircuitOpen(_))));

        release.send(()).unwrap();
        assert!(trial.await.unwrap());
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        assert!(cb.call(async { Ok::<_, &str>(()) }).await.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_trial_call_reopens() {
        let cb = CircuitBreaker::new("mailer", CircuitBreakerConfig {
            failure_threshold: 1,
            open_for: Duration::from_millis(20),
            success_threshold: 1,
        });
        let _ = cb.call(async { Err::<(), _>("error") }).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cb.call(async { Err::<(), _>("still down") }).await.is_err());
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_reset_closes_circuit() {
        let cb = CircuitBreaker::new("mailer", CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        });
        let _ = cb.call(async { Err::<(), _>("error") }).await;
        assert_eq!(cb.state().await.code(), 1);

        cb.reset().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }
}
