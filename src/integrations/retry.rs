//! Bounded retry with exponential backoff for tracker calls
//!
//! One policy serves two purposes: absorbing transient API failures and
//! re-checking JIRA before creating an issue, so that two concurrent
//! workflow runs converge on one JIRA issue per GitHub item.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,

    /// Initial backoff duration
    #[serde(with = "millis")]
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    #[serde(with = "millis")]
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add up to 25% random jitter so racing runs drift apart
    pub jitter: bool,

    /// Longest wait honoured for an explicit Retry-After hint
    #[serde(with = "millis")]
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Same backoff curve with a different retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// No waiting between attempts. Used by tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
            max_retry_after: Duration::ZERO,
        }
    }

    /// Calculate backoff duration for a given attempt
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_secs_f64());

        let final_duration = if self.jitter {
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            capped * jitter_factor
        } else {
            capped
        };

        Duration::from_secs_f64(final_duration)
    }
}

/// Pseudo-random jitter in `0.0..1.0` from the clock's nanoseconds
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Retry classification for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation
    Retry,
    /// Retry after a specific duration (e.g., from Retry-After header)
    RetryAfter(Duration),
    /// Don't retry, the error is permanent
    NoRetry,
}

/// Errors that know whether they are worth retrying
pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Execute an async operation with retry logic
///
/// The operation runs at most `config.max_retries + 1` times. Between
/// attempts the task sleeps for the computed backoff, or for the error's
/// `RetryAfter` hint capped at `max_retry_after`.
///
/// # Returns
/// The result of the operation, or the last error if all retries failed
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let decision = e.retry_decision();

                match decision {
                    RetryDecision::NoRetry => {
                        debug!(
                            operation = operation_name,
                            attempt = attempt,
                            "Operation failed with non-retryable error: {}",
                            e
                        );
                        return Err(e);
                    }
                    RetryDecision::Retry | RetryDecision::RetryAfter(_) => {
                        if attempt >= config.max_retries {
                            debug!(
                                operation = operation_name,
                                attempts = attempt + 1,
                                "Giving up after {} attempts: {}",
                                attempt + 1,
                                e
                            );
                            return Err(e);
                        }

                        let backoff = match decision {
                            RetryDecision::RetryAfter(d) => d.min(config.max_retry_after),
                            _ => config.backoff_duration(attempt),
                        };

                        warn!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            max_attempts = config.max_retries + 1,
                            backoff_secs = backoff.as_secs_f64(),
                            "Retrying after: {}",
                            e
                        );

                        sleep(backoff).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}
