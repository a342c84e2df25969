use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Defaults keep the shared solver well under the origin site's secondary
/// blocking threshold.
const DEFAULT_MAX_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 20;

/// Configuration for the challenge-solving proxy client.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Base URL of the solver endpoint. Required.
    pub endpoint: String,
    /// Solve budget passed to the solver per request, in milliseconds.
    pub max_timeout_ms: u64,
    /// Attempts per fetch for retryable errors.
    pub max_attempts: u32,
    /// Delay between retry attempts.
    pub retry_delay: Duration,
    /// Shared outbound request rate across all callers.
    pub requests_per_minute: u32,
}

impl SolverConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            max_timeout_ms: DEFAULT_MAX_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }

    /// Load from environment variables. `SOLVER_URL` is required; the rest
    /// fall back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let endpoint = std::env::var("SOLVER_URL")
            .map_err(|_| TrackerError::Configuration("SOLVER_URL is not set".to_string()))?;

        let config = Self {
            endpoint,
            max_timeout_ms: env_parsed("SOLVER_MAX_TIMEOUT_MS", DEFAULT_MAX_TIMEOUT_MS),
            max_attempts: env_parsed("SOLVER_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            retry_delay: Duration::from_millis(env_parsed(
                "SOLVER_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )),
            requests_per_minute: env_parsed(
                "SOLVER_REQUESTS_PER_MINUTE",
                DEFAULT_REQUESTS_PER_MINUTE,
            ),
        };

        tracing::info!(
            endpoint = %config.endpoint,
            max_attempts = config.max_attempts,
            requests_per_minute = config.requests_per_minute,
            "Solver config loaded"
        );
        Ok(config)
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
