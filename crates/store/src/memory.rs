//! In-memory record store.
//!
//! All state lives behind a single `RwLock`; holding the write guard for the
//! whole of `merge_badges` is what makes the student update and its log rows
//! one transaction. Uniqueness (student ID, email, one log row per
//! student+badge) is enforced by the keyed maps themselves.

use crate::record::{MergeReceipt, RecordStore};
use async_trait::async_trait;
use badgeboard_domain::{
    BadgeEntry, BadgeId, ProgressLogEntry, StoreError, Student, StudentId,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct State {
    students: HashMap<StudentId, Student>,
    emails: HashMap<String, StudentId>,
    log: Vec<ProgressLogEntry>,
    log_index: HashSet<(StudentId, BadgeId)>,
}

/// Thread-safe in-memory implementation of [`RecordStore`].
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    state: Arc<RwLock<State>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of student records
    pub fn student_count(&self) -> usize {
        self.state.read().students.len()
    }

    /// Total number of progress log rows
    pub fn log_count(&self) -> usize {
        self.state.read().log.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        let mut state = self.state.write();

        if state.students.contains_key(student.id()) {
            return Err(StoreError::DuplicateStudent(student.id().clone()));
        }
        if state.emails.contains_key(student.email()) {
            return Err(StoreError::DuplicateEmail(student.email().to_string()));
        }

        state
            .emails
            .insert(student.email().to_string(), student.id().clone());
        state.students.insert(student.id().clone(), student);
        Ok(())
    }

    async fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.state.read().students.get(id).cloned())
    }

    async fn all_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.state.read().students.values().cloned().collect())
    }

    async fn ranked_students(&self) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> = self.state.read().students.values().cloned().collect();
        students.sort_by_key(|s| (s.rank().unwrap_or(u32::MAX), s.id().clone()));
        Ok(students)
    }

    async fn merge_badges(
        &self,
        id: &StudentId,
        entries: Vec<(BadgeId, BadgeEntry)>,
        now: DateTime<Utc>,
    ) -> Result<MergeReceipt, StoreError> {
        // The write guard spans the student mutation and the log appends; a
        // partially applied merge is unobservable.
        let mut state = self.state.write();
        let State {
            students,
            log,
            log_index,
            ..
        } = &mut *state;

        let student = students
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownStudent(id.clone()))?;

        let mut receipt = MergeReceipt::default();
        for (badge_id, entry) in entries {
            if student.record_badge(badge_id.clone(), entry, now) {
                debug_assert!(!log_index.contains(&(id.clone(), badge_id.clone())));
                log.push(ProgressLogEntry {
                    student_id: id.clone(),
                    badge_id: badge_id.clone(),
                    completed_at: entry.completed_at,
                    time_spent: entry.time_spent,
                    recorded_at: now,
                });
                log_index.insert((id.clone(), badge_id.clone()));
                receipt.applied.push(badge_id);
            } else {
                receipt.skipped.push(badge_id);
            }
        }

        receipt.badges_completed = student.badges_completed();
        receipt.total_time = student.total_time();

        debug!(
            student_id = %id,
            applied = receipt.applied.len(),
            skipped = receipt.skipped.len(),
            "Merge applied"
        );

        Ok(receipt)
    }

    async fn set_ranks(&self, ranks: Vec<(StudentId, u32)>) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for (id, rank) in ranks {
            // A student created after the recalculation snapshot simply has
            // no assignment this pass; the next pass converges.
            if let Some(student) = state.students.get_mut(&id) {
                student.set_rank(rank);
            }
        }
        Ok(())
    }

    async fn progress_log(&self, id: &StudentId) -> Result<Vec<ProgressLogEntry>, StoreError> {
        Ok(self
            .state
            .read()
            .log
            .iter()
            .filter(|entry| &entry.student_id == id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str) -> Student {
        Student::new(
            StudentId::new(id).unwrap(),
            "Test Student",
            format!("{id}@example.com"),
            None,
        )
        .unwrap()
    }

    fn entry(time_spent: u64) -> BadgeEntry {
        BadgeEntry {
            completed_at: Utc::now(),
            time_spent,
        }
    }

    fn badge(id: &str) -> BadgeId {
        BadgeId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id_and_email() {
        let store = MemoryRecordStore::new();
        store.insert_student(student("s-1")).await.unwrap();

        let dup_id = store.insert_student(student("s-1")).await;
        assert!(matches!(dup_id, Err(StoreError::DuplicateStudent(_))));

        let dup_email = Student::new(
            StudentId::new("s-2").unwrap(),
            "Other",
            "s-1@example.com",
            None,
        )
        .unwrap();
        let result = store.insert_student(dup_email).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_merge_applies_only_new_badges() {
        let store = MemoryRecordStore::new();
        let id = StudentId::new("s-1").unwrap();
        store.insert_student(student("s-1")).await.unwrap();

        // Stored badges [A] with 60 minutes
        store
            .merge_badges(&id, vec![(badge("a"), entry(60))], Utc::now())
            .await
            .unwrap();

        // External fetch reports [A, B(90)]
        let receipt = store
            .merge_badges(
                &id,
                vec![(badge("a"), entry(60)), (badge("b"), entry(90))],
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(receipt.applied, vec![badge("b")]);
        assert_eq!(receipt.skipped, vec![badge("a")]);
        assert_eq!(receipt.badges_completed, 2);
        assert_eq!(receipt.total_time, 150);

        // Exactly one new log row for B
        let log = store.progress_log(&id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].badge_id, badge("b"));
    }

    #[tokio::test]
    async fn test_merge_is_idempotent_under_redelivery() {
        let store = MemoryRecordStore::new();
        let id = StudentId::new("s-1").unwrap();
        store.insert_student(student("s-1")).await.unwrap();

        let entries = vec![(badge("a"), entry(60)), (badge("b"), entry(90))];
        for _ in 0..3 {
            store
                .merge_badges(&id, entries.clone(), Utc::now())
                .await
                .unwrap();
        }

        let stored = store.student(&id).await.unwrap().unwrap();
        assert_eq!(stored.badges_completed(), 2);
        assert_eq!(stored.total_time(), 150);
        assert!(stored.check_invariants());
        assert_eq!(store.log_count(), 2);
    }

    #[tokio::test]
    async fn test_merge_unknown_student_fails() {
        let store = MemoryRecordStore::new();
        let result = store
            .merge_badges(
                &StudentId::new("missing").unwrap(),
                vec![(badge("a"), entry(10))],
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::UnknownStudent(_))));
    }

    #[tokio::test]
    async fn test_set_ranks_orders_read_model() {
        let store = MemoryRecordStore::new();
        store.insert_student(student("s-1")).await.unwrap();
        store.insert_student(student("s-2")).await.unwrap();

        store
            .set_ranks(vec![
                (StudentId::new("s-1").unwrap(), 2),
                (StudentId::new("s-2").unwrap(), 1),
            ])
            .await
            .unwrap();

        let ranked = store.ranked_students().await.unwrap();
        assert_eq!(ranked[0].id().as_str(), "s-2");
        assert_eq!(ranked[0].rank(), Some(1));
        assert_eq!(ranked[1].id().as_str(), "s-1");
    }

    #[tokio::test]
    async fn test_set_ranks_skips_unknown_students() {
        let store = MemoryRecordStore::new();
        store.insert_student(student("s-1")).await.unwrap();

        store
            .set_ranks(vec![
                (StudentId::new("s-1").unwrap(), 1),
                (StudentId::new("ghost").unwrap(), 2),
            ])
            .await
            .unwrap();

        let s = store
            .student(&StudentId::new("s-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.rank(), Some(1));
    }
}
