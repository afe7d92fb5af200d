//! Read-only badge catalog lookup.
//!
//! The catalog is seeded out-of-band; the pipeline only reads it to validate
//! externally-reported badge identifiers.

use badgeboard_domain::{Badge, BadgeId};
use std::collections::HashMap;
use std::path::Path;

/// Read-only lookup over the badge catalog.
pub trait BadgeCatalog: Send + Sync {
    /// Look up a badge definition by ID
    fn badge(&self, id: &BadgeId) -> Option<Badge>;

    /// Check whether a badge ID exists in the catalog
    fn contains(&self, id: &BadgeId) -> bool {
        self.badge(id).is_some()
    }

    /// All badges in the catalog, in unspecified order
    fn all(&self) -> Vec<Badge>;
}

/// Catalog backed by an immutable in-memory map.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    badges: HashMap<BadgeId, Badge>,
}

impl StaticCatalog {
    /// Build a catalog from a list of badge definitions. Later duplicates of
    /// the same ID replace earlier ones.
    pub fn from_badges(badges: impl IntoIterator<Item = Badge>) -> Self {
        Self {
            badges: badges
                .into_iter()
                .map(|badge| (badge.id.clone(), badge))
                .collect(),
        }
    }

    /// Load a catalog from a JSON file containing an array of badges.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let badges: Vec<Badge> = serde_json::from_str(&raw)?;
        Ok(Self::from_badges(badges))
    }

    /// Number of badges in the catalog
    pub fn len(&self) -> usize {
        self.badges.len()
    }

    /// Check whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }
}

impl BadgeCatalog for StaticCatalog {
    fn badge(&self, id: &BadgeId) -> Option<Badge> {
        self.badges.get(id).cloned()
    }

    fn contains(&self, id: &BadgeId) -> bool {
        self.badges.contains_key(id)
    }

    fn all(&self) -> Vec<Badge> {
        self.badges.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(id: &str, minutes: u32) -> Badge {
        Badge::new(BadgeId::new(id).unwrap(), format!("Badge {id}"), minutes)
    }

    #[test]
    fn test_lookup_and_contains() {
        let catalog = StaticCatalog::from_badges(vec![badge("a", 60), badge("b", 120)]);

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(&BadgeId::new("a").unwrap()));
        assert!(!catalog.contains(&BadgeId::new("c").unwrap()));

        let found = catalog.badge(&BadgeId::new("b").unwrap()).unwrap();
        assert_eq!(found.estimated_duration, 120);
    }

    #[test]
    fn test_duplicate_ids_keep_last_definition() {
        let catalog = StaticCatalog::from_badges(vec![badge("a", 60), badge("a", 90)]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.badge(&BadgeId::new("a").unwrap()).unwrap().estimated_duration,
            90
        );
    }
}
