//! Worker metrics and monitoring.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

const MAX_RECORDED_DURATIONS: usize = 1_000;

/// Shared counters for the worker pool
#[derive(Clone, Default)]
pub struct WorkerMetrics {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    jobs_processed: u64,
    jobs_succeeded: u64,
    jobs_retried: u64,
    jobs_dead_lettered: u64,
    durations: Vec<Duration>,
}

/// Point-in-time view of the metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total delivery attempts handed to workers
    pub jobs_processed: u64,
    /// Attempts that completed successfully
    pub jobs_succeeded: u64,
    /// Attempts that failed and were rescheduled
    pub jobs_retried: u64,
    /// Jobs moved to the dead-letter queue
    pub jobs_dead_lettered: u64,
    /// Fraction of attempts that succeeded, 0.0 when nothing ran yet
    pub success_rate: f64,
    /// Mean handler duration over the recent window
    pub average_duration: Option<Duration>,
}

impl WorkerMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a job handed to a worker
    pub fn increment_jobs_processed(&self) {
        self.inner.write().jobs_processed += 1;
    }

    /// Count a successful attempt
    pub fn increment_jobs_succeeded(&self) {
        self.inner.write().jobs_succeeded += 1;
    }

    /// Count a failed attempt that was rescheduled
    pub fn increment_jobs_retried(&self) {
        self.inner.write().jobs_retried += 1;
    }

    /// Count a job moved to the dead-letter queue
    pub fn increment_jobs_dead_lettered(&self) {
        self.inner.write().jobs_dead_lettered += 1;
    }

    /// Record how long a handler invocation took
    pub fn record_job_duration(&self, duration: Duration) {
        let mut inner = self.inner.write();
        if inner.durations.len() >= MAX_RECORDED_DURATIONS {
            inner.durations.remove(0);
        }
        inner.durations.push(duration);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        let success_rate = if inner.jobs_processed > 0 {
            inner.jobs_succeeded as f64 / inner.jobs_processed as f64
        } else {
            0.0
        };
        let average_duration = if inner.durations.is_empty() {
            None
        } else {
            Some(inner.durations.iter().sum::<Duration>() / inner.durations.len() as u32)
        };

        MetricsSnapshot {
            jobs_processed: inner.jobs_processed,
            jobs_succeeded: inner.jobs_succeeded,
            jobs_retried: inner.jobs_retried,
            jobs_dead_lettered: inner.jobs_dead_lettered,
            success_rate,
            average_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = WorkerMetrics::new();
        metrics.increment_jobs_processed();
        metrics.increment_jobs_processed();
        metrics.increment_jobs_succeeded();
        metrics.increment_jobs_retried();
        metrics.record_job_duration(Duration::from_millis(100));
        metrics.record_job_duration(Duration::from_millis(300));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_processed, 2);
        assert_eq!(snapshot.jobs_succeeded, 1);
        assert_eq!(snapshot.jobs_retried, 1);
        assert_eq!(snapshot.success_rate, 0.5);
        assert_eq!(snapshot.average_duration, Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_empty_metrics_snapshot() {
        let snapshot = WorkerMetrics::new().snapshot();
        assert_eq!(snapshot.jobs_processed, 0);
        assert_eq!(snapshot.success_rate, 0.0);
        assert!(snapshot.average_duration.is_none());
    }
}
