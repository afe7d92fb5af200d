//! Dense rank recalculation over the full student population.

use badgeboard_domain::{Student, StudentId};
use badgeboard_store::RecordStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Order students for ranking and return the dense 1-based assignment.
///
/// Sort key: badge count descending, total time ascending, last update
/// descending, student id ascending. The id makes the order total, so every
/// pass produces exactly one permutation.
pub fn rank_order(students: &[Student]) -> Vec<(StudentId, u32)> {
    let mut ordered: Vec<&Student> = students.iter().collect();
    ordered.sort_by(|a, b| a.leaderboard_cmp(b));
    ordered
        .into_iter()
        .enumerate()
        .map(|(position, student)| (student.id().clone(), position as u32 + 1))
        .collect()
}

/// Recomputes and publishes ranks after merges change the population.
#[derive(Clone)]
pub struct RankRecalculator {
    store: Arc<dyn RecordStore>,
    // Serializes read+publish: a pass that reads earlier also publishes
    // earlier, so a stale snapshot can never overwrite a fresher one.
    pass_lock: Arc<Mutex<()>>,
}

impl RankRecalculator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Recompute the full ordering and persist it.
    ///
    /// Passes run one at a time. Merges committed while a pass is reading
    /// may or may not be reflected; the next pass converges.
    pub async fn recalculate(&self) -> Result<usize, badgeboard_domain::StoreError> {
        let _pass = self.pass_lock.lock().await;
        let students = self.store.all_students().await?;
        let ranks = rank_order(&students);
        let count = ranks.len();
        self.store.set_ranks(ranks).await?;
        debug!(students = count, "rank recalculation complete");
        Ok(count)
    }
}
