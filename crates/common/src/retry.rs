//! Retry policy with exponential backoff.
//!
//! The job queue consults a [`RetryPolicy`] to decide how long a failed job
//! waits before redelivery and when its attempts are exhausted. Delays are
//! `base * multiplier^(attempt - 1)`, capped at `max_delay`: with the default
//! one-second base the schedule is 1s, 2s, 4s, ...

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts before a job is given up on
    pub max_attempts: u32,

    /// Base delay before the first retry, in milliseconds
    pub base_delay_ms: u64,

    /// Ceiling on any single delay, in milliseconds
    pub max_delay_ms: u64,

    /// Backoff multiplier (e.g. 2.0 for doubling)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt ceiling and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
            ..Default::default()
        }
    }

    /// Set the delay ceiling.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay_ms = max_delay.as_millis() as u64;
        self
    }

    /// Check whether a job that has failed `attempts` times has exhausted
    /// its retries.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Delay before redelivering a job that has failed `attempt` times
    /// (1-based: the first failure asks for `backoff_delay(1)`).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let delay_ms =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        let delay_ms = (delay_ms as u64).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}
