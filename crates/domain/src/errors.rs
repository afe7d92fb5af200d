//! Error types for the badgeboard domain.
//!
//! The sync pipeline classifies every handler failure as either transient
//! (worth retrying through the queue's backoff policy) or permanent (retrying
//! cannot help; the job is routed to the dead-letter queue). `SyncError`
//! carries that classification alongside a stable error code.

use crate::identifiers::{BadgeId, IdError, StudentId};

/// Errors raised while constructing or mutating domain values
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// The email address failed validation
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The display name was empty
    #[error("display name must not be empty")]
    EmptyName,

    /// An identifier failed validation
    #[error(transparent)]
    Id(#[from] IdError),
}

/// Errors raised by the student record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A student with this ID already exists
    #[error("student already exists: {0}")]
    DuplicateStudent(StudentId),

    /// A student with this email already exists
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// No student with this ID exists
    #[error("unknown student: {0}")]
    UnknownStudent(StudentId),

    /// The backing storage could not apply the write
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single sync attempt for one student.
///
/// The queue consults [`SyncError::is_retryable`] to decide between
/// rescheduling with backoff and immediate dead-lettering.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transient failure fetching progress from the external source
    #[error("progress fetch failed: {0}")]
    Fetch(String),

    /// Failure applying the merge to the record store
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The external payload could not be understood; retrying will not help
    #[error("malformed progress payload: {0}")]
    MalformedPayload(String),

    /// The external source reported a badge missing from the catalog
    #[error("unknown badge id: {0}")]
    UnknownBadge(BadgeId),

    /// The job referenced a student that does not exist
    #[error("student not found: {0}")]
    StudentNotFound(StudentId),
}

impl SyncError {
    /// Get the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "FETCH_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::UnknownBadge(_) => "UNKNOWN_BADGE",
            Self::StudentNotFound(_) => "STUDENT_NOT_FOUND",
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// Fetch and store failures are typically transient (network errors,
    /// contended writes); data errors are permanent and go straight to the
    /// dead-letter queue.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Store(_))
    }
}
