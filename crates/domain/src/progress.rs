//! Externally-reported progress and the append-only audit log.

use crate::identifiers::{BadgeId, StudentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single badge completion as reported by the external progress source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedBadge {
    /// The completed badge
    pub badge_id: BadgeId,
    /// When the platform recorded the completion
    pub completed_at: DateTime<Utc>,
    /// Minutes the student spent on the badge
    pub time_spent: u64,
}

/// Append-only audit entry written alongside every applied merge.
///
/// At most one entry exists per (student, badge) pair; entries are never
/// mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressLogEntry {
    /// The student whose progress was recorded
    pub student_id: StudentId,
    /// The badge that was completed
    pub badge_id: BadgeId,
    /// When the platform recorded the completion
    pub completed_at: DateTime<Utc>,
    /// Minutes spent on the badge
    pub time_spent: u64,
    /// When the merge wrote this entry
    pub recorded_at: DateTime<Utc>,
}
