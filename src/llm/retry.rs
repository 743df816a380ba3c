//! Bounded retry for generation calls.
//!
//! A failure is transient when its text mentions one of a small set of
//! markers (rate limiting, overload, timeouts, network trouble, service
//! unavailability). Transient failures are retried with a linearly growing
//! delay; everything else is terminal on the first attempt.

use std::future::Future;
use std::time::Duration;

use super::error::LlmError;

/// Case-insensitive substrings that mark a failure as worth retrying.
const TRANSIENT_MARKERS: &[&str] = &[
    "rate limit",
    "overloaded",
    "timed out",
    "timeout",
    "network error",
    "unavailable",
];

/// Check if an error is transient and should be retried.
pub fn is_transient(error: &LlmError) -> bool {
    is_transient_message(&error.to_string())
}

/// Substring classification over a raw error message.
pub fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `(n + 1) * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before the retry that follows attempt `retry_count`.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        self.base_delay.saturating_mul(retry_count + 1)
    }

    /// Run `op` until it succeeds, fails terminally, or retries run out.
    ///
    /// `op` receives the current retry count (0 for the first attempt).
    /// Failures that will be retried are logged as warnings; the failure
    /// that ends the loop is logged once as an error.
    pub async fn run<T, F, Fut>(&self, service: &str, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut retry_count = 0;

        loop {
            match op(retry_count).await {
                Ok(value) => {
                    if retry_count > 0 {
                        tracing::info!(
                            "{} request succeeded after {} retries",
                            service,
                            retry_count
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if retry_count < self.max_retries && is_transient(&error) {
                        tracing::warn!(
                            "{} (attempt {}/{})",
                            error.user_message(service),
                            retry_count + 1,
                            self.max_retries + 1
                        );
                        let wait = self.delay_for(retry_count);
                        tracing::info!(
                            "Waiting {:?} before retry {}/{}...",
                            wait,
                            retry_count + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(wait).await;
                        retry_count += 1;
                    } else {
                        if retry_count > 0 {
                            tracing::error!(
                                "{} (gave up after {} retries)",
                                error.user_message(service),
                                retry_count
                            );
                        } else {
                            tracing::error!("{}", error.user_message(service));
                        }
                        return Err(error);
                    }
                }
            }
        }
    }
}
