//! Retry logic for control-plane bootstrap fetches.
//!
//! # Responsibilities
//! - Retry a fallible async operation with exponential backoff + jitter
//! - Stop after a bounded attempt count or total elapsed time
//!
//! # Design Decisions
//! - Only used for discovery fetches; forwarded requests are never retried
//!   since they may not be idempotent
//! - The caller decides whether exhaustion is fatal

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::BootstrapRetryConfig;
use crate::resilience::backoff::backoff_delay;

/// Bounds for a retry sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_elapsed: Duration,
}

impl From<&BootstrapRetryConfig> for RetryPolicy {
    fn from(config: &BootstrapRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_elapsed: Duration::from_secs(config.max_elapsed_secs),
        }
    }
}

/// The operation kept failing until the policy gave up.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempts: {last}")]
pub struct RetryExhausted<E> {
    pub operation: &'static str,
    pub attempts: u32,
    pub last: E,
}

/// Run `op` until it succeeds or the policy is exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                let delay = backoff_delay(attempt, policy.base_delay, policy.max_delay);
                let out_of_time = started.elapsed() + delay > policy.max_elapsed;
                if attempt >= policy.max_attempts || out_of_time {
                    tracing::error!(operation, attempts = attempt, error = %e, "Giving up");
                    return Err(RetryExhausted {
                        operation,
                        attempts: attempt,
                        last: e,
                    });
                }
                tracing::warn!(operation, attempt, delay = ?delay, error = %e, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
