//! Badge catalog reference data.
//!
//! Badges are globally defined units of learning content. The catalog is
//! seeded out-of-band and read-only to the sync pipeline.

use crate::identifiers::BadgeId;
use serde::{Deserialize, Serialize};

/// A badge definition from the catalog. Immutable after seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Stable identifier of the badge
    pub id: BadgeId,
    /// Human-readable title
    pub title: String,
    /// Expected time to complete, in minutes
    pub estimated_duration: u32,
}

impl Badge {
    /// Create a new badge definition
    pub fn new(id: BadgeId, title: impl Into<String>, estimated_duration: u32) -> Self {
        Self {
            id,
            title: title.into(),
            estimated_duration,
        }
    }
}
