//! The per-job sync handler: fetch, validate, merge, re-rank.

use crate::merge::merge_plan;
use crate::rank::RankRecalculator;
use crate::source::ProgressSource;
use async_trait::async_trait;
use badgeboard_domain::{StudentId, SyncError};
use badgeboard_store::{BadgeCatalog, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// What one successful sync did to the student record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Badges newly recorded by this sync
    pub badges_applied: usize,
    /// Badges already on the record and skipped
    pub badges_skipped: usize,
    /// Whether a rank recalculation ran after the merge
    pub reranked: bool,
}

/// Executes one sync job for one student.
///
/// Safe to run twice for the same student: the merge skips badges already
/// recorded, so a redelivered job reduces to a no-op.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn sync_student(&self, student_id: &StudentId) -> Result<SyncOutcome, SyncError>;
}

/// The production handler wiring source, catalog, store, and recalculator.
pub struct StudentSyncHandler {
    source: Arc<dyn ProgressSource>,
    catalog: Arc<dyn BadgeCatalog>,
    store: Arc<dyn RecordStore>,
    recalculator: RankRecalculator,
}

impl StudentSyncHandler {
    pub fn new(
        source: Arc<dyn ProgressSource>,
        catalog: Arc<dyn BadgeCatalog>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let recalculator = RankRecalculator::new(store.clone());
        Self {
            source,
            catalog,
            store,
            recalculator,
        }
    }
}

#[async_trait]
impl SyncHandler for StudentSyncHandler {
    async fn sync_student(&self, student_id: &StudentId) -> Result<SyncOutcome, SyncError> {
        let student = self
            .store
            .student(student_id)
            .await?
            .ok_or_else(|| SyncError::StudentNotFound(student_id.clone()))?;

        let fetched = self
            .source
            .fetch_progress(student_id, student.credential())
            .await?;

        // A badge id the catalog has never issued means the payload itself
        // is wrong, not that the upstream is flaky.
        for completed in &fetched {
            if !self.catalog.contains(&completed.badge_id) {
                return Err(SyncError::UnknownBadge(completed.badge_id.clone()));
            }
        }

        let plan = merge_plan(&student, &fetched);
        if plan.is_noop() {
            debug!(student_id = %student_id, "progress already up to date");
            return Ok(SyncOutcome {
                badges_skipped: plan.already_recorded.len(),
                ..SyncOutcome::default()
            });
        }

        let receipt = self
            .store
            .merge_badges(student_id, plan.new_entries, Utc::now())
            .await?;

        info!(
            student_id = %student_id,
            applied = receipt.applied.len(),
            badges_completed = receipt.badges_completed,
            total_time = receipt.total_time,
            "merged new badge completions"
        );

        let mut outcome = SyncOutcome {
            badges_applied: receipt.applied.len(),
            badges_skipped: receipt.skipped.len() + plan.already_recorded.len(),
            reranked: false,
        };

        if receipt.changed() {
            self.recalculator.recalculate().await?;
            outcome.reranked = true;
        }

        Ok(outcome)
    }
}

// The handler tests live in tests/handler_tests.rs: they use
// `badgeboard-testing`, which depends on this crate, so linking it into the
// unit-test build would create a second copy of the `ProgressSource` trait.
