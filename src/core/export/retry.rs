//! Bounded retry with exponential backoff
//!
//! Wraps the three suspension points of an export: page reads, point writes
//! and checkpoint saves. Only errors classified by
//! [`crate::domain::HastatsError::is_retryable`] are retried.

use crate::config::RetryConfig;
use crate::domain::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff parameters derived from `[retry]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: true,
        }
    }

    /// No retries, for tests and one-shot CLI commands.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (1-based), capped at `max_delay`.
    /// Jitter adds up to 25% on top of the capped value.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        let delay = if self.jitter && capped > 0.0 {
            capped + capped * 0.25 * rand::thread_rng().gen_range(0.0..1.0)
        } else {
            capped
        };
        Duration::from_nanos((delay * 1e9).round() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts `policy.max_retries` retries.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                crate::log_retry_attempt!(
                    name,
                    attempt,
                    policy.max_retries,
                    delay.as_millis() as u64,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 0 {
                    tracing::error!(
                        operation = name,
                        attempts = attempt + 1,
                        error = %e,
                        "Operation failed after retries"
                    );
                }
                return Err(e);
            }
        }
    }
}
