//! Pipeline configuration.

use crate::queue::QueueOptions;
use badgeboard_common::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Sync pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Number of concurrent workers in the pool
    pub pool_size: usize,

    /// Queue and retry settings
    pub queue: QueueConfig,

    /// Job-start rate limit shared across the pool
    pub rate: RateConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            queue: QueueConfig::default(),
            rate: RateConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a JSON file; missing fields keep defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Retry policy for failed jobs
    pub retry: RetryPolicy,

    /// How long a claimed job stays invisible before reclaim, in milliseconds
    pub visibility_timeout_ms: u64,

    /// How many dead-lettered jobs to retain for inspection
    pub dead_letter_retention: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            visibility_timeout_ms: 300_000,
            dead_letter_retention: 100,
        }
    }
}

impl QueueConfig {
    /// Convert to the queue's runtime options
    pub fn to_options(&self) -> QueueOptions {
        QueueOptions {
            retry: self.retry.clone(),
            visibility_timeout: Duration::from_millis(self.visibility_timeout_ms),
            dead_letter_retention: self.dead_letter_retention,
        }
    }
}

/// Job-start rate limit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Maximum job starts per interval across the whole pool
    pub max_starts: u32,

    /// Length of the rate window, in milliseconds
    pub interval_ms: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            max_starts: 1,
            interval_ms: 1_000,
        }
    }
}

impl RateConfig {
    /// The rate window as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_deployment() {
        let config = SyncConfig::default();
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.queue.retry.max_attempts, 3);
        assert_eq!(config.queue.retry.base_delay_ms, 1_000);
        assert_eq!(config.queue.dead_letter_retention, 100);
        assert_eq!(config.rate.max_starts, 1);
        assert_eq!(config.rate.interval_ms, 1_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"pool_size": 8, "rate": {"max_starts": 2}}"#).unwrap();
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.rate.max_starts, 2);
        assert_eq!(config.rate.interval_ms, 1_000);
        assert_eq!(config.queue, QueueConfig::default());
    }
}
