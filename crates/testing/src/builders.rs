//! Fluent builder pattern for constructing test data.

use badgeboard_domain::{BadgeEntry, BadgeId, SealedCredential, Student, StudentId};
use chrono::{DateTime, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

/// Builder for creating [`Student`] test instances
#[derive(Clone)]
pub struct StudentBuilder {
    id: StudentId,
    name: String,
    email: String,
    credential: Option<SealedCredential>,
    badges: Vec<(BadgeId, BadgeEntry)>,
    merged_at: DateTime<Utc>,
}

impl StudentBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: StudentId::new(id).expect("student id is valid"),
            name: Name().fake(),
            email: format!("{id}-{}", SafeEmail().fake::<String>()),
            credential: Some(SealedCredential::new("test-sealed-credential")),
            badges: Vec::new(),
            merged_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = None;
        self
    }

    /// Record a completed badge with the given time spent, in minutes.
    pub fn with_badge(mut self, badge_id: &str, time_spent: u64) -> Self {
        self.badges.push((
            BadgeId::new(badge_id).expect("badge id is valid"),
            BadgeEntry {
                completed_at: Utc::now(),
                time_spent,
            },
        ));
        self
    }

    /// Timestamp applied as `last_updated` when badges are recorded.
    pub fn merged_at(mut self, at: DateTime<Utc>) -> Self {
        self.merged_at = at;
        self
    }

    pub fn build(self) -> Student {
        let mut student = Student::new(self.id, self.name, self.email, self.credential)
            .expect("builder produces a valid student");
        for (badge_id, entry) in self.badges {
            student.record_badge(badge_id, entry, self.merged_at);
        }
        student
    }
}
