//! The bounded-concurrency sync worker pool.

use crate::handler::SyncHandler;
use crate::limiter::RateGate;
use crate::metrics::WorkerMetrics;
use crate::queue::{FailureDisposition, SyncQueue};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A fixed-width pool of workers draining the sync queue.
///
/// Workers suspend only at `dequeue` and inside handler I/O. Stopping is
/// cooperative: the queue is closed, pending jobs stay queued, and every
/// in-flight job runs to completion before `stop` returns.
pub struct SyncWorkerPool {
    queue: Arc<SyncQueue>,
    handler: Arc<dyn SyncHandler>,
    gate: Arc<RateGate>,
    metrics: WorkerMetrics,
    pool_size: usize,
    handles: Vec<JoinHandle<()>>,
}

impl SyncWorkerPool {
    pub fn new(
        queue: Arc<SyncQueue>,
        handler: Arc<dyn SyncHandler>,
        gate: Arc<RateGate>,
        pool_size: usize,
    ) -> Self {
        Self {
            queue,
            handler,
            gate,
            metrics: WorkerMetrics::new(),
            pool_size,
            handles: Vec::new(),
        }
    }

    /// Pool-wide processing metrics
    pub fn metrics(&self) -> WorkerMetrics {
        self.metrics.clone()
    }

    /// Spawn the workers. Idempotent while running.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            return;
        }

        info!(pool_size = self.pool_size, "starting sync worker pool");
        for worker_id in 0..self.pool_size {
            let queue = self.queue.clone();
            let handler = self.handler.clone();
            let gate = self.gate.clone();
            let metrics = self.metrics.clone();
            self.handles.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, handler, gate, metrics).await;
            }));
        }
    }

    /// Close the queue and wait for every worker to drain its current job.
    pub async fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        info!("stopping sync worker pool");
        self.queue.close();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked during shutdown");
            }
        }
        info!("sync worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<SyncQueue>,
    handler: Arc<dyn SyncHandler>,
    gate: Arc<RateGate>,
    metrics: WorkerMetrics,
) {
    debug!(worker_id, "worker started");

    loop {
        // Pass the gate before claiming so a job's visibility clock only
        // runs while it is actually being processed
        gate.acquire().await;
        let Some(job) = queue.dequeue().await else {
            break;
        };

        let started = Instant::now();
        let result = handler.sync_student(&job.student_id).await;
        metrics.increment_jobs_processed();
        metrics.record_job_duration(started.elapsed());

        match result {
            Ok(outcome) => {
                metrics.increment_jobs_succeeded();
                debug!(
                    worker_id,
                    job_id = %job.id,
                    student_id = %job.student_id,
                    badges_applied = outcome.badges_applied,
                    "job completed"
                );
                if let Err(e) = queue.ack(job.id) {
                    warn!(job_id = %job.id, error = %e, "failed to ack job");
                }
            }
            Err(sync_error) => match queue.fail(job.id, &sync_error) {
                Ok(FailureDisposition::Retried { delay }) => {
                    metrics.increment_jobs_retried();
                    warn!(
                        worker_id,
                        job_id = %job.id,
                        student_id = %job.student_id,
                        attempt = job.attempts + 1,
                        error_code = sync_error.error_code(),
                        error = %sync_error,
                        retry_in_ms = delay.as_millis() as u64,
                        "job failed, scheduled for retry"
                    );
                }
                Ok(FailureDisposition::DeadLettered) => {
                    metrics.increment_jobs_dead_lettered();
                    error!(
                        worker_id,
                        job_id = %job.id,
                        student_id = %job.student_id,
                        error_code = sync_error.error_code(),
                        error = %sync_error,
                        "job dead-lettered"
                    );
                }
                Err(e) => warn!(job_id = %job.id, error = %e, "failed to record job failure"),
            },
        }
    }

    debug!(worker_id, "worker exiting");
}
