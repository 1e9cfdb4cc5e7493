//! Retry policy and error classification for backend calls.
//!
//! Pure types and functions for deciding **whether** and **when** to retry a
//! failed request. No async code, no HTTP, no I/O here; the actual retry
//! loop lives in the caller, as an explicit loop with an attempt counter, so
//! the schedule and termination condition stay unit-testable on their own.

use std::time::Duration;

use crate::llm::BackendError;

/// Classification of a backend failure for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient: rate limit, overload, or gateway fault. Safe to retry.
    Retryable,
    /// Permanent: bad credentials, malformed request, anything else.
    Fatal,
}

/// Bounded exponential backoff.
///
/// The delay before retry *n* (0-indexed) is:
///
/// ```text
/// delay = min(base_delay_ms * 2^n, max_delay_ms)
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Classify an HTTP status code.
    ///
    /// Retryable: 429 (rate limit), 502 (bad gateway), 503 (overloaded /
    /// unavailable), 504 (gateway timeout). Everything else is fatal.
    pub fn classify_http_status(status: u16) -> ErrorClass {
        match status {
            429 | 502 | 503 | 504 => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        }
    }

    /// Classify a backend failure by its structural status, never by
    /// message content. Failures without a status are fatal.
    pub fn classify(error: &BackendError) -> ErrorClass {
        error
            .status()
            .map_or(ErrorClass::Fatal, Self::classify_http_status)
    }

    /// Backoff delay before retry `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exponential.min(self.max_delay_ms))
    }
}
