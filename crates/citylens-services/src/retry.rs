//! Bounded retry with a fixed delay between attempts.
//!
//! Every provider failure (transport error, non-success status, malformed
//! payload) is retried until the attempt budget is spent. A successful
//! answer is returned as-is, even when it is empty.
//!
//! The policy itself is a pure state machine (`RetryPolicy::step`); the
//! async driver `with_retry` only adds the sleeping.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use citylens_core::{AppError, PoiConfig, ProviderError};

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before each retry (constant, not exponential)
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Sleep for `delay`, then run attempt number `next_attempt`
    Retry { next_attempt: u32, delay: Duration },
    /// Budget spent; surface the last error
    Exhausted,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn from_config(config: &PoiConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay_ms)
    }

    /// Transition after 1-based attempt `failed_attempt` failed
    pub fn step(&self, failed_attempt: u32) -> RetryStep {
        if failed_attempt < self.max_attempts.max(1) {
            RetryStep::Retry {
                next_attempt: failed_attempt + 1,
                delay: self.delay,
            }
        } else {
            RetryStep::Exhausted
        }
    }
}

/// Emitted before each retry so callers can show "retry 2/3"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryProgress {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: ProviderError,
}

impl fmt::Display for RetryProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retry {}/{}", self.attempt, self.max_attempts)
    }
}

/// Run `operation` under `policy`.
///
/// `operation` receives the 1-based attempt number. `on_retry` is called
/// before every attempt after the first.
///
/// # Errors
/// `AppError::RetriesExhausted` carrying the last provider error once every
/// attempt has failed.
pub async fn with_retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: P,
) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: FnMut(&RetryProgress),
{
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Request succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(
                    "Attempt {} of {} failed: {}",
                    attempt,
                    policy.max_attempts,
                    e
                );

                match policy.step(attempt) {
                    RetryStep::Retry {
                        next_attempt,
                        delay,
                    } => {
                        tokio::time::sleep(delay).await;
                        on_retry(&RetryProgress {
                            attempt: next_attempt,
                            max_attempts: policy.max_attempts,
                            last_error: e,
                        });
                        attempt = next_attempt;
                    }
                    RetryStep::Exhausted => {
                        tracing::error!("All {} attempts exhausted", attempt);
                        return Err(AppError::RetriesExhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                }
            }
        }
    }
}
