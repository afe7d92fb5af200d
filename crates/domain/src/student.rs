//! The durable per-student record and leaderboard ordering.
//!
//! A `Student` owns the invariant that `badges_completed == |badges|` and
//! `total_time == Σ time_spent`: the badge collection and the aggregates are
//! private and only move together through [`Student::record_badge`]. The sync
//! worker is the only writer of badge state; rank is assigned separately by
//! the rank recalculator.

use crate::errors::DomainError;
use crate::identifiers::{BadgeId, StudentId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Opaque encrypted refresh credential for the external progress source.
///
/// The pipeline never inspects the contents; it only forwards them to the
/// source. `Debug` output is redacted so the credential cannot leak into
/// logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedCredential(String);

impl SealedCredential {
    /// Wrap an already-encrypted credential
    pub fn new(sealed: impl Into<String>) -> Self {
        Self(sealed.into())
    }

    /// Expose the sealed contents for transmission to the external source
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedCredential(<redacted>)")
    }
}

/// A badge completion stored on the student record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeEntry {
    /// When the platform recorded the completion
    pub completed_at: DateTime<Utc>,
    /// Minutes spent on the badge
    pub time_spent: u64,
}

/// Durable per-student state.
///
/// Badge completions are kept in recording order (an `IndexMap` keyed by
/// badge ID), which also enforces per-student badge uniqueness structurally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    id: StudentId,
    name: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    credential: Option<SealedCredential>,
    badges: IndexMap<BadgeId, BadgeEntry>,
    total_time: u64,
    last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rank: Option<u32>,
}

impl Student {
    /// Create a new student record with no completions.
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        email: impl Into<String>,
        credential: Option<SealedCredential>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }

        let email = email.into();
        if !validator::validate_email(email.as_str()) {
            return Err(DomainError::InvalidEmail(email));
        }

        Ok(Self {
            id,
            name,
            email,
            credential,
            badges: IndexMap::new(),
            total_time: 0,
            last_updated: Utc::now(),
            rank: None,
        })
    }

    /// The student's identifier
    pub fn id(&self) -> &StudentId {
        &self.id
    }

    /// The student's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The student's contact email
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The sealed external-auth credential, if one is stored
    pub fn credential(&self) -> Option<&SealedCredential> {
        self.credential.as_ref()
    }

    /// Number of completed badges
    pub fn badges_completed(&self) -> usize {
        self.badges.len()
    }

    /// Total accumulated time across all completed badges, in minutes
    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    /// When the record last changed through a merge
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// The current leaderboard rank, if one has been assigned
    pub fn rank(&self) -> Option<u32> {
        self.rank
    }

    /// Check whether a badge is already recorded
    pub fn has_badge(&self, badge_id: &BadgeId) -> bool {
        self.badges.contains_key(badge_id)
    }

    /// Iterate completions in recording order
    pub fn badges(&self) -> impl Iterator<Item = (&BadgeId, &BadgeEntry)> {
        self.badges.iter()
    }

    /// Record a badge completion.
    ///
    /// Returns `false` without changing anything when the badge is already
    /// present: first-write-wins, even if the reported entry differs. On a
    /// new badge the aggregates and `last_updated` move in the same call.
    pub fn record_badge(&mut self, badge_id: BadgeId, entry: BadgeEntry, now: DateTime<Utc>) -> bool {
        if self.badges.contains_key(&badge_id) {
            return false;
        }
        self.total_time += entry.time_spent;
        self.badges.insert(badge_id, entry);
        self.last_updated = now;
        true
    }

    /// Assign the leaderboard rank. Only the rank recalculator calls this.
    pub fn set_rank(&mut self, rank: u32) {
        self.rank = Some(rank);
    }

    /// Leaderboard ordering: more badges first, then less total time, then
    /// most recent activity, then student ID for determinism.
    pub fn leaderboard_cmp(&self, other: &Self) -> Ordering {
        other
            .badges_completed()
            .cmp(&self.badges_completed())
            .then_with(|| self.total_time.cmp(&other.total_time))
            .then_with(|| other.last_updated.cmp(&self.last_updated))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Verify the aggregate invariants hold. The structure makes violation
    /// impossible from outside this module; this exists for store tests.
    pub fn check_invariants(&self) -> bool {
        self.total_time == self.badges.values().map(|e| e.time_spent).sum::<u64>()
    }
}
