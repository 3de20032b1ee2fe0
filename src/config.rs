//! Placement job configuration, loaded from environment variables.

use std::time::Duration;

use crate::utils::{CircuitBreakerConfig, RetryConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct PlacementConfig {
    /// Reported as `job_name` on every alert
    pub job_name: String,
    /// Upper bound on orders processed at the same time
    pub max_concurrency: usize,
    /// Re-send the placement notification for orders found already complete
    pub notify_already_complete: bool,
    pub metrics_port: Option<u16>,
    pub notifier_retry: RetryConfig,
    pub notifier_breaker: CircuitBreakerConfig,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            job_name: "StandingOrderPlacement".to_string(),
            max_concurrency: 4,
            notify_already_complete: false,
            metrics_port: None,
            notifier_retry: RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(200),
                max_delay: Duration::from_secs(5),
                multiplier: 2.0,
            },
            notifier_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl PlacementConfig {
    /// Load configuration from environment variables
    ///
    /// - `PLACEMENT_JOB_NAME`
    /// - `PLACEMENT_MAX_CONCURRENCY` (positive integer)
    /// - `PLACEMENT_NOTIFY_ALREADY_COMPLETE` (true/false/1/0)
    /// - `PLACEMENT_METRICS_PORT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("PLACEMENT_JOB_NAME").filter(|v| !v.trim().is_empty()) {
            config.job_name = name;
        }

        if let Some(raw) = lookup("PLACEMENT_MAX_CONCURRENCY") {
            config.max_concurrency = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "PLACEMENT_MAX_CONCURRENCY",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            };
        }

        if let Some(raw) = lookup("PLACEMENT_NOTIFY_ALREADY_COMPLETE") {
            config.notify_already_complete = parse_bool(&raw).ok_or(ConfigError::Invalid {
                name: "PLACEMENT_NOTIFY_ALREADY_COMPLETE",
                expected: "true or false",
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = lookup("PLACEMENT_METRICS_PORT") {
            let port = raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PLACEMENT_METRICS_PORT",
                expected: "a TCP port",
                value: raw.clone(),
            })?;
            config.metrics_port = Some(port);
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
