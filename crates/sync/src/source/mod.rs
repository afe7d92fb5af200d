//! External progress source port.

mod http;

pub use http::HttpProgressSource;

use async_trait::async_trait;
use badgeboard_domain::{CompletedBadge, SealedCredential, StudentId, SyncError};

/// Where the pipeline fetches a student's current completions from.
///
/// Implementations classify failures: transport problems and upstream
/// overload map to [`SyncError::Fetch`] (retryable), while responses the
/// source can never turn into a valid payload map to
/// [`SyncError::MalformedPayload`] (permanent).
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Fetch the full list of completions for one student.
    async fn fetch_progress(
        &self,
        student_id: &StudentId,
        credential: Option<&SealedCredential>,
    ) -> Result<Vec<CompletedBadge>, SyncError>;
}
