//! Testing utilities for Badgeboard
//!
//! This crate provides:
//! - Fixtures for the badge catalog and common domain values
//! - A builder for constructing student records in tests
//! - A scripted progress source for driving the pipeline deterministically

pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use builders::*;
pub use fixtures::*;
pub use mocks::*;

// Re-export testing dependencies for convenience
pub use fake;
pub use proptest;
pub use wiremock;
