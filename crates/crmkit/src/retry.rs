//! Retry logic with exponential backoff for transient errors.
//!
//! Rate limits, server errors and unclassified failures are retried; every
//! other error kind returns on the first attempt.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::Duration;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is about to be retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay: Duration) {}
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback<'a> {
    /// Name of the remote operation being retried
    pub operation: &'a str,
}

impl RetryCallback for LogCallback<'_> {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!(
            "{} attempt {}/{} failed ({}): {}. Retrying in {}ms",
            self.operation,
            attempt,
            max_attempts,
            error.kind(),
            error,
            delay.as_millis()
        );
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, waiting
/// `config.delay_for_attempt(n)` between attempts (or longer if the server
/// asked for it, never beyond `config.max_delay`).
///
/// # Returns
/// The result of the operation, or the last error once the attempt ceiling
/// is reached.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt + 1 >= max_attempts {
                    return Err(e);
                }

                let delay = delay_before_retry(config, attempt, &e);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, max_attempts, &e, delay);
                }

                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// Execute an operation with retry using the default config and no callback.
pub fn with_retry_simple<T, F>(operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry(&RetryConfig::default(), None, operation)
}

fn delay_before_retry(config: &RetryConfig, attempt: u32, error: &Error) -> Duration {
    let backoff = config.delay_for_attempt(attempt);
    match error.retry_after() {
        Some(requested) if requested > backoff => requested.min(config.max_delay),
        _ => backoff,
    }
}
