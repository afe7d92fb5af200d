//! Badgeboard Domain Types
//!
//! This crate provides the core domain model for the badgeboard leaderboard
//! platform. It defines all domain entities, value objects, errors, and the
//! leaderboard ordering using strongly-typed Rust structures with validation
//! and serialization support.
//!
//! ## Architecture
//!
//! The domain layer is organized into the following modules:
//!
//! - **identifiers**: Strongly-typed identifiers for students, badges, and jobs
//! - **badge**: Immutable badge catalog reference data
//! - **student**: The durable per-student record and leaderboard ordering
//! - **progress**: Externally-reported completions and the append-only audit log
//! - **errors**: Error taxonomy with retryability classification
//!
//! ## Usage
//!
//! ```rust
//! use badgeboard_domain::{BadgeId, Student, StudentId};
//!
//! let id = StudentId::new("s-1001").unwrap();
//! let student = Student::new(id, "Ada Lovelace", "ada@example.com", None).unwrap();
//!
//! assert_eq!(student.badges_completed(), 0);
//! assert_eq!(student.total_time(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod badge;
pub mod errors;
pub mod identifiers;
pub mod progress;
pub mod student;

// Re-export commonly used types
pub use badge::Badge;
pub use errors::{DomainError, StoreError, SyncError};
pub use identifiers::{BadgeId, IdError, JobId, StudentId};
pub use progress::{CompletedBadge, ProgressLogEntry};
pub use student::{BadgeEntry, SealedCredential, Student};
