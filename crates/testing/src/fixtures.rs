//! Test fixtures for generating domain entities with realistic data.

use badgeboard_domain::{Badge, BadgeEntry, BadgeId, CompletedBadge};
use chrono::{Duration, Utc};

/// The badge catalog the production deployment is seeded with.
pub fn gcp_badge_catalog() -> Vec<Badge> {
    [
        ("getting-started", "Getting Started with Google Cloud", 60),
        ("cloud-computing", "Introduction to Cloud Computing", 120),
        ("gcp-core", "Google Cloud Platform Fundamentals", 180),
        ("kubernetes", "Getting Started with Kubernetes", 240),
        ("app-engine", "Developing Apps with App Engine", 180),
        ("cloud-functions", "Serverless with Cloud Functions", 120),
        ("cloud-storage", "Cloud Storage Essentials", 90),
        ("bigquery", "BigQuery for Data Analysis", 150),
        ("cloud-sql", "Managing Databases with Cloud SQL", 120),
        ("networking", "Cloud Networking Fundamentals", 180),
        ("security", "Cloud Security Best Practices", 210),
        ("monitoring", "Monitoring and Logging", 150),
        ("devops", "DevOps on Google Cloud", 240),
        ("ml-apis", "Machine Learning APIs", 180),
        ("cloud-ai", "AI Platform Fundamentals", 210),
        ("data-engineering", "Data Engineering Basics", 240),
        ("cloud-architecture", "Cloud Architecture Design", 300),
        ("terraform", "Infrastructure as Code with Terraform", 180),
        ("cloud-run", "Containerization with Cloud Run", 150),
        ("advanced-security", "Advanced Security Controls", 240),
    ]
    .into_iter()
    .map(|(id, title, estimated_duration)| Badge {
        id: BadgeId::new(id).expect("seed badge id is valid"),
        title: title.to_string(),
        estimated_duration,
    })
    .collect()
}

/// A completion observed `minutes_ago` minutes in the past.
pub fn completed_badge(badge_id: &str, time_spent: u64, minutes_ago: i64) -> CompletedBadge {
    CompletedBadge {
        badge_id: BadgeId::new(badge_id).expect("badge id is valid"),
        completed_at: Utc::now() - Duration::minutes(minutes_ago),
        time_spent,
    }
}

/// A stored badge entry completed `minutes_ago` minutes in the past.
pub fn badge_entry(time_spent: u64, minutes_ago: i64) -> BadgeEntry {
    BadgeEntry {
        completed_at: Utc::now() - Duration::minutes(minutes_ago),
        time_spent,
    }
}
