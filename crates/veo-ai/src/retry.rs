//! Retry utilities for provider calls.
//!
//! Both providers retry a bounded number of times: vision calls back off
//! exponentially, generation calls linearly. Which errors are worth retrying
//! is decided by the caller.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::metrics::record_retry;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^attempt`
    Exponential { base: Duration },
    /// `step * (attempt + 1)`
    Linear { step: Duration },
}

impl Backoff {
    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt))
            }
            Backoff::Linear { step } => step.saturating_mul(attempt.saturating_add(1)),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Operation name for logging and metrics.
    pub operation_name: String,
}

impl RetryPolicy {
    /// Exponential policy used for vision calls: 1s, 2s, 4s...
    pub fn exponential(operation_name: impl Into<String>) -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
            },
            max_delay: Duration::from_secs(30),
            operation_name: operation_name.into(),
        }
    }

    /// Linear policy used for generation calls: 1s, 2s, 3s...
    pub fn linear(operation_name: impl Into<String>) -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::Linear {
                step: Duration::from_secs(1),
            },
            max_delay: Duration::from_secs(30),
            operation_name: operation_name.into(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the backoff unit, keeping its shape.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.backoff = match self.backoff {
            Backoff::Exponential { .. } => Backoff::Exponential { base: base_delay },
            Backoff::Linear { .. } => Backoff::Linear { step: base_delay },
        };
        self
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt).min(self.max_delay)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Failed on a non-retryable error or after all retries were used.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation with retry logic.
///
/// `operation` receives the zero-based attempt index. Errors for which
/// `is_retryable` returns false end the loop immediately.
pub async fn retry_async<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if attempt < policy.max_retries && is_retryable(&e) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{} attempt {}/{} failed, retrying in {:?}: {}",
                    policy.operation_name,
                    attempt + 1,
                    policy.max_attempts(),
                    delay,
                    e
                );
                record_retry(&policy.operation_name);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(
                    "{} gave up after {} attempt(s): {}",
                    policy.operation_name,
                    attempt + 1,
                    e
                );
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt + 1,
                };
            }
        }
    }
}
