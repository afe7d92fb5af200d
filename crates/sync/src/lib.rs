//! Badgeboard progress synchronization pipeline.
//!
//! This crate keeps student badge records in step with the external learning
//! platform. It provides:
//! - An in-process job queue with per-student deduplication, priorities,
//!   exponential-backoff retry, and a dead-letter buffer
//! - A bounded worker pool with a shared job-start rate limit
//! - An idempotent fetch/merge handler and the dense-rank recalculator
//! - Processing metrics for operational visibility

#![warn(clippy::all)]

pub mod config;
pub mod handler;
pub mod limiter;
pub mod merge;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod rank;
pub mod source;

pub use config::{QueueConfig, RateConfig, SyncConfig};
pub use handler::{StudentSyncHandler, SyncHandler, SyncOutcome};
pub use limiter::RateGate;
pub use merge::{merge_plan, MergePlan};
pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use pool::SyncWorkerPool;
pub use queue::{FailureDisposition, QueueError, QueueOptions, SyncJob, SyncQueue};
pub use rank::{rank_order, RankRecalculator};
pub use source::{HttpProgressSource, ProgressSource};

use badgeboard_domain::{JobId, StudentId};
use std::sync::Arc;

/// The assembled pipeline: queue, pool, and their shared wiring.
pub struct SyncPipeline {
    queue: Arc<SyncQueue>,
    pool: SyncWorkerPool,
}

impl SyncPipeline {
    /// Assemble a pipeline around a handler with the given configuration.
    pub fn new(config: &SyncConfig, handler: Arc<dyn SyncHandler>) -> Self {
        let queue = Arc::new(SyncQueue::new(config.queue.to_options()));
        let gate = Arc::new(RateGate::new(config.rate.max_starts, config.rate.interval()));
        let pool = SyncWorkerPool::new(queue.clone(), handler, gate, config.pool_size);
        Self { queue, pool }
    }

    /// Request a sync for one student. Returns the outstanding job's id,
    /// which is an existing job when one is already queued or running.
    pub fn enqueue_sync(&self, student_id: StudentId, priority: i32) -> JobId {
        self.queue.enqueue(student_id, priority)
    }

    /// The underlying queue, for inspection and dead-letter operations.
    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.queue
    }

    /// Pool-wide processing metrics
    pub fn metrics(&self) -> WorkerMetrics {
        self.pool.metrics()
    }

    /// Start (or restart) the worker pool.
    pub fn start(&mut self) {
        self.queue.reopen();
        self.pool.start();
    }

    /// Stop the pool cooperatively; queued jobs survive for the next start.
    pub async fn stop(&mut self) {
        self.pool.stop().await;
    }
}
