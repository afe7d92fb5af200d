//! The student record store port.
//!
//! The store is mutated only through two operations with atomicity
//! requirements: [`RecordStore::merge_badges`], which must apply the student
//! update and its progress log rows as one transaction, and
//! [`RecordStore::set_ranks`], which must publish a complete rank assignment
//! at once. Reads always observe the last fully-committed state.

use async_trait::async_trait;
use badgeboard_domain::{
    BadgeEntry, BadgeId, ProgressLogEntry, StoreError, Student, StudentId,
};
use chrono::{DateTime, Utc};

/// Result of applying a merge to one student record.
#[derive(Debug, Clone, Default)]
pub struct MergeReceipt {
    /// Badges newly recorded by this merge, in application order
    pub applied: Vec<BadgeId>,
    /// Badges skipped because they were already present (first-write-wins)
    pub skipped: Vec<BadgeId>,
    /// Badge count after the merge
    pub badges_completed: usize,
    /// Total accumulated time after the merge, in minutes
    pub total_time: u64,
}

impl MergeReceipt {
    /// Whether the merge changed the record at all
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Durable per-student state plus the append-only progress log.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new student record. Student IDs and emails are unique.
    async fn insert_student(&self, student: Student) -> Result<(), StoreError>;

    /// Fetch a single student record
    async fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError>;

    /// Fetch all student records, in unspecified order
    async fn all_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Fetch all ranked students ordered by rank ascending (the leaderboard
    /// read model view); students not yet ranked sort last
    async fn ranked_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Apply newly observed completions to one student record.
    ///
    /// Badges already present are skipped; each applied badge also appends a
    /// progress log row. The student update and its log rows commit together
    /// or not at all.
    async fn merge_badges(
        &self,
        id: &StudentId,
        entries: Vec<(BadgeId, BadgeEntry)>,
        now: DateTime<Utc>,
    ) -> Result<MergeReceipt, StoreError>;

    /// Publish a complete rank assignment. Students missing from the
    /// assignment (e.g. created mid-recalculation) keep their previous rank
    /// until the next pass.
    async fn set_ranks(&self, ranks: Vec<(StudentId, u32)>) -> Result<(), StoreError>;

    /// Read the audit log for one student, in recording order
    async fn progress_log(&self, id: &StudentId) -> Result<Vec<ProgressLogEntry>, StoreError>;
}
