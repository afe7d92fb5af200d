//! Sync job types and lifecycle.

use badgeboard_domain::{JobId, StudentId, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Queued and waiting to be claimed
    Pending,
    /// Claimed by a worker and being processed
    Active,
    /// Finished successfully; about to be removed from the queue
    Completed,
    /// Failed and waiting for its backoff delay before redelivery
    Failed,
    /// Retries exhausted or error permanent; retained for inspection
    DeadLettered,
}

/// A per-student synchronization request.
///
/// At most one job per student is outstanding at any time; the queue's
/// student index enforces that on enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    /// Unique job identifier
    pub id: JobId,
    /// The student to synchronize
    pub student_id: StudentId,
    /// Delivery priority; higher runs first, ties are FIFO
    pub priority: i32,
    /// Number of failed attempts so far
    pub attempts: u32,
    /// Attempt ceiling before dead-lettering
    pub max_attempts: u32,
    /// Current lifecycle state
    pub state: JobState,
    /// When the job was enqueued
    pub created_at: DateTime<Utc>,
    /// When the job becomes eligible for delivery
    pub scheduled_at: DateTime<Utc>,
    /// When the current (or last) attempt started
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Code and message of the most recent failure
    pub last_error: Option<String>,
}

impl SyncJob {
    /// Create a new pending job
    pub fn new(student_id: StudentId, priority: i32, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            student_id,
            priority,
            attempts: 0,
            max_attempts,
            state: JobState::Pending,
            created_at: now,
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }

    /// Mark the job as claimed by a worker
    pub fn mark_active(&mut self) {
        self.state = JobState::Active;
        self.started_at = Some(Utc::now());
    }

    /// Mark the job as completed
    pub fn mark_completed(&mut self) {
        self.state = JobState::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Record a failed attempt and the time it becomes eligible again
    pub fn mark_failed(&mut self, error: &SyncError, next_attempt_at: DateTime<Utc>) {
        self.attempts += 1;
        self.state = JobState::Failed;
        self.scheduled_at = next_attempt_at;
        self.last_error = Some(format!("{}: {}", error.error_code(), error));
    }

    /// Move the job to the dead-letter state
    pub fn mark_dead_lettered(&mut self, error: &SyncError) {
        self.attempts += 1;
        self.state = JobState::DeadLettered;
        self.completed_at = Some(Utc::now());
        self.last_error = Some(format!("{}: {}", error.error_code(), error));
    }

    /// Whether another delivery attempt is allowed
    pub fn should_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> SyncJob {
        SyncJob::new(StudentId::new("s-1").unwrap(), 0, 3)
    }

    #[test]
    fn test_job_creation() {
        let job = job();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.priority, 0);
        assert!(job.should_retry());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = job();

        job.mark_active();
        assert_eq!(job.state, JobState::Active);
        assert!(job.started_at.is_some());

        job.mark_completed();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_job_retry_accounting() {
        let mut job = job();
        let err = SyncError::Fetch("timeout".into());

        job.mark_failed(&err, Utc::now());
        assert_eq!(job.attempts, 1);
        assert!(job.should_retry());
        assert!(job.last_error.as_deref().unwrap().starts_with("FETCH_ERROR"));

        job.mark_failed(&err, Utc::now());
        job.mark_failed(&err, Utc::now());
        assert_eq!(job.attempts, 3);
        assert!(!job.should_retry());
    }

    #[test]
    fn test_dead_letter_preserves_error() {
        let mut job = job();
        job.mark_dead_lettered(&SyncError::MalformedPayload("not json".into()));

        assert_eq!(job.state, JobState::DeadLettered);
        assert!(job
            .last_error
            .as_deref()
            .unwrap()
            .starts_with("MALFORMED_PAYLOAD"));
    }
}
