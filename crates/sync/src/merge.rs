//! Delta computation between externally fetched progress and the stored
//! student record.
//!
//! The plan is pure: it decides which completions are new without touching
//! the store, so redelivered jobs and overlapping payloads reduce to an
//! empty plan instead of a double-count.

use badgeboard_domain::{BadgeEntry, BadgeId, CompletedBadge, Student};
use std::collections::HashSet;

/// The set of completions a merge should apply to one student record.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Completions not yet present on the record, in payload order
    pub new_entries: Vec<(BadgeId, BadgeEntry)>,
    /// Badge ids skipped because the record already holds them
    pub already_recorded: Vec<BadgeId>,
}

impl MergePlan {
    /// Whether applying the plan would change the record
    pub fn is_noop(&self) -> bool {
        self.new_entries.is_empty()
    }
}

/// Compute the delta between a fetched payload and the stored record.
///
/// A badge id appearing more than once in the payload is applied once, from
/// its first occurrence.
pub fn merge_plan(student: &Student, fetched: &[CompletedBadge]) -> MergePlan {
    let mut plan = MergePlan::default();
    let mut seen: HashSet<&BadgeId> = HashSet::new();

    for completed in fetched {
        if student.has_badge(&completed.badge_id) || !seen.insert(&completed.badge_id) {
            plan.already_recorded.push(completed.badge_id.clone());
            continue;
        }
        plan.new_entries.push((
            completed.badge_id.clone(),
            BadgeEntry {
                completed_at: completed.completed_at,
                time_spent: completed.time_spent,
            },
        ));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use badgeboard_domain::{SealedCredential, StudentId};
    use chrono::Utc;

    fn student_with(badges: &[&str]) -> Student {
        let mut student = Student::new(
            StudentId::new("s-1").unwrap(),
            "Ada",
            "ada@example.com".to_string(),
            Some(SealedCredential::new("sealed")),
        )
        .unwrap();
        for badge in badges {
            student.record_badge(
                BadgeId::new(*badge).unwrap(),
                BadgeEntry {
                    completed_at: Utc::now(),
                    time_spent: 60,
                },
                Utc::now(),
            );
        }
        student
    }

    fn completed(badge: &str, time_spent: u64) -> CompletedBadge {
        CompletedBadge {
            badge_id: BadgeId::new(badge).unwrap(),
            completed_at: Utc::now(),
            time_spent,
        }
    }

    #[test]
    fn test_only_unseen_badges_planned() {
        let student = student_with(&["badge-a"]);
        let plan = merge_plan(&student, &[completed("badge-a", 60), completed("badge-b", 90)]);

        assert_eq!(plan.new_entries.len(), 1);
        assert_eq!(plan.new_entries[0].0.as_str(), "badge-b");
        assert_eq!(plan.new_entries[0].1.time_spent, 90);
        assert_eq!(plan.already_recorded.len(), 1);
    }

    #[test]
    fn test_full_overlap_is_noop() {
        let student = student_with(&["badge-a", "badge-b"]);
        let plan = merge_plan(&student, &[completed("badge-a", 60), completed("badge-b", 90)]);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_duplicate_within_payload_applied_once() {
        let student = student_with(&[]);
        let plan = merge_plan(&student, &[completed("badge-a", 60), completed("badge-a", 45)]);

        assert_eq!(plan.new_entries.len(), 1);
        assert_eq!(plan.new_entries[0].1.time_spent, 60);
        assert_eq!(plan.already_recorded.len(), 1);
    }
}
