//! Retry policy for provider requests.

use std::time::Duration;

use reqwest::StatusCode;

/// Statuses worth another attempt: request timeout, too early, too many
/// requests, and the transient server errors.
pub const RETRY_STATUSES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_FACTOR: Duration = Duration::from_millis(100);

/// How many times a request is sent and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never less than 1.
    pub max_attempts: u32,
    /// Sleep before the n-th retry is `backoff_factor * 2^(n-1)`.
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_factor: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_factor,
        }
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }

    /// True if a request that just finished attempt number `attempt`
    /// (starting at 1) may be sent again.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (starting at 1).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_factor.saturating_mul(1 << exponent)
    }
}
