//! Error types for gh-jira-sync
//!
//! Every failure the sync can hit, split the way the retry policy needs it:
//! transient tracker errors are retried, permanent ones and configuration
//! errors are not. Uses thiserror for ergonomic error handling.

use crate::integrations::retry::{RetryDecision, RetryableError};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for gh-jira-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Default wait when a tracker rate-limits us without a Retry-After header
pub const DEFAULT_RATE_LIMIT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed or missing input. Aborts the whole run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network hiccup, timeout or 5xx from a tracker
    #[error("Transient tracker error: {0}")]
    Transient(String),

    /// Rate limited, with the number of seconds the tracker asked us to wait
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication or validation failure reported by a tracker
    #[error("Tracker error: {0}")]
    Permanent(String),

    /// Item does not exist on the tracker
    #[error("Not found: {0}")]
    NotFound(String),

    /// Webhook event payload could not be interpreted
    #[error("Event error: {0}")]
    Event(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    /// Classify a non-success HTTP status from a tracker.
    ///
    /// 429 becomes [`SyncError::RateLimited`], 5xx/408 become
    /// [`SyncError::Transient`], 404/410 become [`SyncError::NotFound`] and
    /// everything else is permanent.
    pub fn from_status(status: reqwest::StatusCode, retry_after: Option<u64>, detail: String) -> Self {
        match status.as_u16() {
            429 => SyncError::RateLimited(retry_after.unwrap_or(DEFAULT_RATE_LIMIT_SECS)),
            408 | 500..=599 => SyncError::Transient(format!("HTTP {}: {}", status, detail)),
            404 | 410 => SyncError::NotFound(detail),
            _ => SyncError::Permanent(format!("HTTP {}: {}", status, detail)),
        }
    }

    /// True for errors the bounded retry policy may retry
    pub fn is_transient(&self) -> bool {
        !matches!(self.retry_decision(), RetryDecision::NoRetry)
    }
}

impl RetryableError for SyncError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            SyncError::Transient(_) => RetryDecision::Retry,
            SyncError::RateLimited(secs) => RetryDecision::RetryAfter(Duration::from_secs(*secs)),
            SyncError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    RetryDecision::Retry
                } else if let Some(status) = e.status() {
                    match status.as_u16() {
                        429 => RetryDecision::RetryAfter(Duration::from_secs(
                            DEFAULT_RATE_LIMIT_SECS,
                        )),
                        500..=599 => RetryDecision::Retry,
                        _ => RetryDecision::NoRetry,
                    }
                } else if e.is_decode() || e.is_builder() {
                    RetryDecision::NoRetry
                } else {
                    RetryDecision::Retry
                }
            }
            SyncError::Config(_)
            | SyncError::Permanent(_)
            | SyncError::NotFound(_)
            | SyncError::Event(_)
            | SyncError::Io(_)
            | SyncError::Json(_)
            | SyncError::Yaml(_) => RetryDecision::NoRetry,
        }
    }
}

/// Parse a Retry-After header value given in whole seconds
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
