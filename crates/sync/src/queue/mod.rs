//! In-process sync job queue.
//!
//! Broker-free reimplementation of the delayed-job queue the pipeline needs:
//! an explicit priority heap for ready jobs, a min-heap of retry/visibility
//! deadlines for scheduled ones, and a per-student index that keeps at most
//! one job outstanding per student. All structures live under one mutex;
//! workers suspend on a [`tokio::sync::Notify`] in `dequeue`.
//!
//! Delivery is at-least-once: a claim carries a visibility deadline, and a
//! claim whose worker never reports back becomes reclaimable once the
//! deadline passes.

pub mod job;

pub use job::{JobState, SyncJob};

use badgeboard_common::RetryPolicy;
use badgeboard_domain::{JobId, StudentId, SyncError};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Errors raised by queue bookkeeping operations
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The job ID is not known to the queue
    #[error("unknown job: {0}")]
    UnknownJob(JobId),
}

/// How a reported failure was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The job was rescheduled with the given backoff delay
    Retried {
        /// Delay before the job becomes eligible again
        delay: Duration,
    },
    /// The job was moved to the dead-letter queue
    DeadLettered,
}

/// Tuning knobs for the queue
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Retry/backoff policy for failed jobs
    pub retry: RetryPolicy,
    /// How long a claimed job stays invisible before it is reclaimable
    pub visibility_timeout: Duration,
    /// How many dead-lettered jobs to retain (oldest evicted first)
    pub dead_letter_retention: usize,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            visibility_timeout: Duration::from_secs(300),
            dead_letter_retention: 100,
        }
    }
}

/// Entry in the ready heap: priority descending, enqueue sequence ascending.
#[derive(Debug, PartialEq, Eq)]
struct ReadyEntry {
    priority: i32,
    seq: u64,
    job_id: JobId,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Entry in the scheduled heap, ordered so the earliest deadline pops first.
#[derive(Debug, PartialEq, Eq)]
struct ScheduledEntry {
    due: Instant,
    seq: u64,
    job_id: JobId,
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct QueueState {
    jobs: HashMap<JobId, SyncJob>,
    by_student: HashMap<StudentId, JobId>,
    ready: BinaryHeap<ReadyEntry>,
    scheduled: BinaryHeap<ScheduledEntry>,
    active: HashMap<JobId, Instant>,
    dead: VecDeque<SyncJob>,
    next_seq: u64,
    closed: bool,
}

impl QueueState {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Durable-enough, priority-ordered, at-least-once delivery queue of sync
/// requests keyed by student.
pub struct SyncQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    options: QueueOptions,
}

impl SyncQueue {
    /// Create a queue with the given options
    pub fn new(options: QueueOptions) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            options,
        }
    }

    /// Enqueue a sync request for a student.
    ///
    /// If a job for this student is already pending, scheduled, or active,
    /// the call is a no-op and returns the outstanding job's ID; the running
    /// job will pick up the latest external state anyway.
    pub fn enqueue(&self, student_id: StudentId, priority: i32) -> JobId {
        let mut state = self.state.lock();

        if let Some(existing) = state.by_student.get(&student_id) {
            let existing = *existing;
            debug!(student_id = %student_id, job_id = %existing, "Sync already outstanding, enqueue deduplicated");
            return existing;
        }

        let job = SyncJob::new(student_id.clone(), priority, self.options.retry.max_attempts);
        let job_id = job.id;
        let seq = state.next_seq();

        state.by_student.insert(student_id, job_id);
        state.ready.push(ReadyEntry {
            priority,
            seq,
            job_id,
        });
        state.jobs.insert(job_id, job);
        drop(state);

        debug!(job_id = %job_id, priority, "Job enqueued");
        self.notify.notify_one();
        job_id
    }

    /// Claim the next eligible job, suspending until one is available.
    ///
    /// Returns `None` once the queue has been closed; unclaimed jobs stay
    /// queued for the next start.
    pub async fn dequeue(&self) -> Option<SyncJob> {
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.promote_due(&mut state);

                if state.closed {
                    return None;
                }

                if let Some(job) = self.claim_ready(&mut state) {
                    return Some(job);
                }

                self.earliest_deadline(&state)
                    .map(|due| due.saturating_duration_since(Instant::now()))
            };

            match wait {
                Some(delay) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = sleep(delay) => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Acknowledge successful completion; the job is removed from storage.
    pub fn ack(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        let mut job = state
            .jobs
            .remove(&job_id)
            .ok_or(QueueError::UnknownJob(job_id))?;

        state.active.remove(&job_id);
        Self::drop_student_index(&mut state, &job);
        job.mark_completed();

        debug!(job_id = %job_id, student_id = %job.student_id, "Job completed");
        Ok(())
    }

    /// Report a failed attempt.
    ///
    /// Retryable errors reschedule the job with exponential backoff until the
    /// attempt ceiling; permanent errors and exhausted retries dead-letter it.
    pub fn fail(&self, job_id: JobId, error: &SyncError) -> Result<FailureDisposition, QueueError> {
        let mut state = self.state.lock();
        state.active.remove(&job_id);

        let mut job = state
            .jobs
            .remove(&job_id)
            .ok_or(QueueError::UnknownJob(job_id))?;

        if !error.is_retryable() {
            job.mark_dead_lettered(error);
            warn!(
                job_id = %job_id,
                student_id = %job.student_id,
                error_code = error.error_code(),
                "Permanent error, job dead-lettered without retry"
            );
            Self::drop_student_index(&mut state, &job);
            Self::retain_dead(&mut state, job, self.options.dead_letter_retention);
            return Ok(FailureDisposition::DeadLettered);
        }

        let attempts_after = job.attempts + 1;
        if self.options.retry.is_exhausted(attempts_after) {
            job.mark_dead_lettered(error);
            warn!(
                job_id = %job_id,
                student_id = %job.student_id,
                attempts = job.attempts,
                "Retries exhausted, job dead-lettered"
            );
            Self::drop_student_index(&mut state, &job);
            Self::retain_dead(&mut state, job, self.options.dead_letter_retention);
            return Ok(FailureDisposition::DeadLettered);
        }

        let delay = self.options.retry.backoff_delay(attempts_after);
        let next_attempt_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        job.mark_failed(error, next_attempt_at);
        state.jobs.insert(job_id, job);

        let seq = state.next_seq();
        state.scheduled.push(ScheduledEntry {
            due: Instant::now() + delay,
            seq,
            job_id,
        });
        drop(state);

        debug!(
            job_id = %job_id,
            delay_ms = delay.as_millis(),
            "Job rescheduled with backoff"
        );
        // Wake a dequeuer so it can re-derive its sleep deadline
        self.notify.notify_one();
        Ok(FailureDisposition::Retried { delay })
    }

    /// Stop delivering jobs. In-flight claims are unaffected; pending and
    /// scheduled jobs remain queued.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Resume delivery after a [`close`](Self::close)
    pub fn reopen(&self) {
        self.state.lock().closed = false;
        self.notify.notify_waiters();
    }

    /// Snapshot of the most recent dead-lettered jobs, newest first
    pub fn dead_letter_jobs(&self, limit: usize) -> Vec<SyncJob> {
        let state = self.state.lock();
        state.dead.iter().rev().take(limit).cloned().collect()
    }

    /// Re-queue a dead-lettered job with a reset attempt counter.
    ///
    /// If the student has acquired a new outstanding job in the meantime, the
    /// dead-lettered copy is discarded and that job's ID is returned.
    pub fn retry_dead_letter(&self, job_id: JobId) -> Result<JobId, QueueError> {
        let mut state = self.state.lock();
        let position = state
            .dead
            .iter()
            .position(|job| job.id == job_id)
            .ok_or(QueueError::UnknownJob(job_id))?;
        let mut job = state
            .dead
            .remove(position)
            .ok_or(QueueError::UnknownJob(job_id))?;

        if let Some(existing) = state.by_student.get(&job.student_id) {
            return Ok(*existing);
        }

        job.attempts = 0;
        job.state = JobState::Pending;
        job.last_error = None;
        job.completed_at = None;
        job.scheduled_at = Utc::now();

        let seq = state.next_seq();
        state.by_student.insert(job.student_id.clone(), job.id);
        state.ready.push(ReadyEntry {
            priority: job.priority,
            seq,
            job_id: job.id,
        });
        state.jobs.insert(job.id, job);
        drop(state);

        self.notify.notify_one();
        Ok(job_id)
    }

    /// Number of jobs awaiting delivery (excluding scheduled retries)
    pub fn ready_depth(&self) -> usize {
        let state = self.state.lock();
        state
            .jobs
            .values()
            .filter(|job| job.state == JobState::Pending)
            .count()
    }

    /// Number of jobs waiting out a backoff delay
    pub fn scheduled_depth(&self) -> usize {
        let state = self.state.lock();
        state
            .jobs
            .values()
            .filter(|job| job.state == JobState::Failed)
            .count()
    }

    /// Number of retained dead-lettered jobs
    pub fn dead_letter_depth(&self) -> usize {
        self.state.lock().dead.len()
    }

    /// Move due retries to the ready heap and reclaim expired claims.
    fn promote_due(&self, state: &mut QueueState) {
        let now = Instant::now();

        while let Some(entry) = state.scheduled.peek() {
            if entry.due > now {
                break;
            }
            let entry = state.scheduled.pop().expect("peeked entry");
            let priority = match state.jobs.get_mut(&entry.job_id) {
                Some(job) => {
                    job.state = JobState::Pending;
                    job.priority
                }
                None => continue,
            };
            let seq = state.next_seq();
            state.ready.push(ReadyEntry {
                priority,
                seq,
                job_id: entry.job_id,
            });
        }

        let expired: Vec<JobId> = state
            .active
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for job_id in expired {
            state.active.remove(&job_id);
            let priority = match state.jobs.get_mut(&job_id) {
                Some(job) => {
                    warn!(job_id = %job_id, student_id = %job.student_id, "Visibility timeout expired, job reclaimed");
                    job.state = JobState::Pending;
                    job.priority
                }
                None => continue,
            };
            let seq = state.next_seq();
            state.ready.push(ReadyEntry {
                priority,
                seq,
                job_id,
            });
        }
    }

    /// Pop the highest-priority claimable job, skipping stale heap entries.
    fn claim_ready(&self, state: &mut QueueState) -> Option<SyncJob> {
        while let Some(entry) = state.ready.pop() {
            match state.jobs.get_mut(&entry.job_id) {
                Some(job) if job.state == JobState::Pending => {
                    job.mark_active();
                    let claimed = job.clone();
                    state
                        .active
                        .insert(entry.job_id, Instant::now() + self.options.visibility_timeout);
                    return Some(claimed);
                }
                // Acked, dead-lettered, or re-pushed under a newer entry
                _ => continue,
            }
        }
        None
    }

    fn earliest_deadline(&self, state: &QueueState) -> Option<Instant> {
        let scheduled = state.scheduled.peek().map(|entry| entry.due);
        let reclaim = state.active.values().min().copied();
        match (scheduled, reclaim) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn drop_student_index(state: &mut QueueState, job: &SyncJob) {
        if state.by_student.get(&job.student_id) == Some(&job.id) {
            state.by_student.remove(&job.student_id);
        }
    }

    fn retain_dead(state: &mut QueueState, job: SyncJob, retention: usize) {
        state.dead.push_back(job);
        while state.dead.len() > retention {
            state.dead.pop_front();
        }
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new(QueueOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgeboard_common::RetryPolicy;
    use std::time::Duration;

    fn sid(s: &str) -> StudentId {
        StudentId::new(s).unwrap()
    }

    fn fast_queue(max_attempts: u32) -> SyncQueue {
        SyncQueue::new(QueueOptions {
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(10)),
            visibility_timeout: Duration::from_secs(60),
            dead_letter_retention: 100,
        })
    }

    #[tokio::test]
    async fn test_priority_order_with_fifo_ties() {
        let queue = fast_queue(3);
        queue.enqueue(sid("low-1"), 0);
        queue.enqueue(sid("high"), 5);
        queue.enqueue(sid("low-2"), 0);

        let first = queue.dequeue().await.unwrap();
        let second = queue.dequeue().await.unwrap();
        let third = queue.dequeue().await.unwrap();

        assert_eq!(first.student_id, sid("high"));
        assert_eq!(second.student_id, sid("low-1"));
        assert_eq!(third.student_id, sid("low-2"));
    }

    #[tokio::test]
    async fn test_enqueue_deduplicates_per_student() {
        let queue = fast_queue(3);
        let first = queue.enqueue(sid("s-1"), 0);
        let second = queue.enqueue(sid("s-1"), 7);
        assert_eq!(first, second);
        assert_eq!(queue.ready_depth(), 1);

        // Still deduplicated while the job is active
        let job = queue.dequeue().await.unwrap();
        let third = queue.enqueue(sid("s-1"), 0);
        assert_eq!(third, job.id);

        // After ack a fresh job is accepted
        queue.ack(job.id).unwrap();
        let fourth = queue.enqueue(sid("s-1"), 0);
        assert_ne!(fourth, first);
    }

    #[tokio::test]
    async fn test_concurrent_enqueues_yield_one_job() {
        let queue = std::sync::Arc::new(fast_queue(3));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move { queue.enqueue(sid("s-1"), 0) }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(queue.ready_depth(), 1);
    }

    #[tokio::test]
    async fn test_fail_reschedules_with_backoff() {
        let queue = fast_queue(3);
        queue.enqueue(sid("s-1"), 0);

        let job = queue.dequeue().await.unwrap();
        let disposition = queue.fail(job.id, &SyncError::Fetch("timeout".into())).unwrap();
        assert_eq!(
            disposition,
            FailureDisposition::Retried {
                delay: Duration::from_millis(10)
            }
        );
        assert_eq!(queue.scheduled_depth(), 1);

        // The job comes back after its delay, with the attempt recorded
        let retried = queue.dequeue().await.unwrap();
        assert_eq!(retried.id, job.id);
        assert_eq!(retried.attempts, 1);
    }

    #[tokio::test]
    async fn test_third_failure_dead_letters_and_never_redelivers() {
        let queue = fast_queue(3);
        queue.enqueue(sid("s-1"), 0);
        let err = SyncError::Fetch("connection refused".into());

        for attempt in 1..=3u32 {
            let job = queue.dequeue().await.unwrap();
            let disposition = queue.fail(job.id, &err).unwrap();
            if attempt < 3 {
                assert!(matches!(disposition, FailureDisposition::Retried { .. }));
            } else {
                assert_eq!(disposition, FailureDisposition::DeadLettered);
            }
        }

        assert_eq!(queue.ready_depth(), 0);
        assert_eq!(queue.scheduled_depth(), 0);
        let dead = queue.dead_letter_jobs(10);
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].state, JobState::DeadLettered);
        assert_eq!(dead[0].attempts, 3);
        assert!(dead[0].last_error.is_some());

        // No fourth automatic delivery: the queue is empty and closed
        // delivery returns None rather than the dead job
        queue.close();
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_permanent_error_skips_retries() {
        let queue = fast_queue(3);
        queue.enqueue(sid("s-1"), 0);

        let job = queue.dequeue().await.unwrap();
        let disposition = queue
            .fail(job.id, &SyncError::MalformedPayload("bad json".into()))
            .unwrap();
        assert_eq!(disposition, FailureDisposition::DeadLettered);
        assert_eq!(queue.dead_letter_jobs(10)[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_dead_letter_retention_is_bounded() {
        let queue = SyncQueue::new(QueueOptions {
            retry: RetryPolicy::new(1, Duration::from_millis(1)),
            visibility_timeout: Duration::from_secs(60),
            dead_letter_retention: 3,
        });

        for i in 0..5 {
            queue.enqueue(sid(&format!("s-{i}")), 0);
            let job = queue.dequeue().await.unwrap();
            queue.fail(job.id, &SyncError::Fetch("down".into())).unwrap();
        }

        assert_eq!(queue.dead_letter_depth(), 3);
        // Newest first; the two oldest were evicted
        let dead = queue.dead_letter_jobs(10);
        assert_eq!(dead[0].student_id, sid("s-4"));
        assert_eq!(dead[2].student_id, sid("s-2"));
    }

    #[tokio::test]
    async fn test_retry_dead_letter_requeues_job() {
        let queue = SyncQueue::new(QueueOptions {
            retry: RetryPolicy::new(1, Duration::from_millis(1)),
            visibility_timeout: Duration::from_secs(60),
            dead_letter_retention: 10,
        });

        queue.enqueue(sid("s-1"), 0);
        let job = queue.dequeue().await.unwrap();
        queue.fail(job.id, &SyncError::Fetch("down".into())).unwrap();

        let requeued = queue.retry_dead_letter(job.id).unwrap();
        assert_eq!(requeued, job.id);
        assert_eq!(queue.dead_letter_depth(), 0);

        let redelivered = queue.dequeue().await.unwrap();
        assert_eq!(redelivered.id, job.id);
        assert_eq!(redelivered.attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_timeout_reclaims_claim() {
        let queue = SyncQueue::new(QueueOptions {
            retry: RetryPolicy::default(),
            visibility_timeout: Duration::from_secs(5),
            dead_letter_retention: 10,
        });

        queue.enqueue(sid("s-1"), 0);
        let claimed = queue.dequeue().await.unwrap();

        // The claiming worker crashes: no ack, no fail. After the visibility
        // timeout the job is claimable again.
        let reclaimed = queue.dequeue().await.unwrap();
        assert_eq!(reclaimed.id, claimed.id);
    }

    #[tokio::test]
    async fn test_close_leaves_pending_jobs_queued() {
        let queue = fast_queue(3);
        queue.enqueue(sid("s-1"), 0);
        queue.close();

        assert!(queue.dequeue().await.is_none());
        assert_eq!(queue.ready_depth(), 1);

        queue.reopen();
        assert!(queue.dequeue().await.is_some());
    }

    #[tokio::test]
    async fn test_dequeue_suspends_until_enqueue() {
        let queue = std::sync::Arc::new(fast_queue(3));
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        queue.enqueue(sid("s-1"), 0);
        let job = waiter.await.unwrap().unwrap();
        assert_eq!(job.student_id, sid("s-1"));
    }
}
