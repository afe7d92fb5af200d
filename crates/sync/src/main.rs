//! Badgeboard Sync Worker
//!
//! Background worker that keeps student badge records in sync with the
//! external learning platform and maintains leaderboard ranks.

use anyhow::{Context, Result};
use badgeboard_common::init_tracing;
use badgeboard_domain::{SealedCredential, Student, StudentId};
use badgeboard_store::{MemoryRecordStore, RecordStore, StaticCatalog};
use badgeboard_sync::{HttpProgressSource, StudentSyncHandler, SyncConfig, SyncPipeline};
use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Worker pool size
    #[arg(short, long, env = "SYNC_POOL_SIZE")]
    workers: Option<usize>,

    /// Base URL of the learning platform API
    #[arg(long, env = "PROGRESS_SOURCE_URL")]
    source_url: String,

    /// Badge catalog JSON file
    #[arg(long, env = "BADGE_CATALOG")]
    catalog: String,

    /// Student roster JSON file; each entry is enqueued for an initial sync
    #[arg(long, env = "STUDENT_ROSTER")]
    roster: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "SYNC_CONFIG")]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    json_logs: bool,

    /// Print metrics interval (seconds)
    #[arg(long, env = "METRICS_INTERVAL", default_value = "60")]
    metrics_interval: u64,
}

/// One roster entry as provisioned by the enrollment process
#[derive(Debug, Deserialize)]
struct RosterEntry {
    student_id: String,
    name: String,
    email: String,
    credential: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.json_logs, "info")?;

    info!(source_url = %args.source_url, "Starting Badgeboard Sync Worker");

    let mut config = if let Some(config_path) = &args.config {
        info!(config_path = %config_path, "Loading configuration from file");
        SyncConfig::from_json_file(config_path)?
    } else {
        SyncConfig::default()
    };
    if let Some(workers) = args.workers {
        config.pool_size = workers;
    }

    info!(
        pool_size = config.pool_size,
        max_attempts = config.queue.retry.max_attempts,
        rate_max_starts = config.rate.max_starts,
        "Worker configuration loaded"
    );

    let catalog = StaticCatalog::from_json_file(&args.catalog)
        .with_context(|| format!("failed to load badge catalog from {}", args.catalog))?;
    info!(badges = catalog.len(), "Badge catalog loaded");

    let store = Arc::new(MemoryRecordStore::new());
    let source = HttpProgressSource::new(args.source_url.clone())
        .map_err(|e| anyhow::anyhow!("failed to build progress source: {e}"))?;
    let handler = Arc::new(StudentSyncHandler::new(
        Arc::new(source),
        Arc::new(catalog),
        store.clone(),
    ));

    let mut pipeline = SyncPipeline::new(&config, handler);

    if let Some(roster_path) = &args.roster {
        let enrolled = load_roster(store.as_ref(), roster_path).await?;
        info!(students = enrolled.len(), "Student roster loaded");
        for student_id in enrolled {
            pipeline.enqueue_sync(student_id, 0);
        }
    }

    let metrics = pipeline.metrics();
    let metrics_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(args.metrics_interval));
        loop {
            interval.tick().await;
            let snapshot = metrics.snapshot();
            info!(
                jobs_processed = snapshot.jobs_processed,
                jobs_succeeded = snapshot.jobs_succeeded,
                jobs_retried = snapshot.jobs_retried,
                jobs_dead_lettered = snapshot.jobs_dead_lettered,
                success_rate = format!("{:.2}%", snapshot.success_rate * 100.0),
                avg_duration_ms = snapshot
                    .average_duration
                    .map(|d| d.as_millis())
                    .unwrap_or(0),
                "Worker metrics"
            );
        }
    });

    pipeline.start();
    info!("Worker pool started");

    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal");

    pipeline.stop().await;
    metrics_handle.abort();

    info!("Worker shutting down gracefully");
    Ok(())
}

/// Insert roster entries into the store, returning the enrolled ids.
async fn load_roster(store: &dyn RecordStore, path: &str) -> Result<Vec<StudentId>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read student roster from {path}"))?;
    let entries: Vec<RosterEntry> =
        serde_json::from_str(&raw).context("invalid student roster file")?;

    let mut enrolled = Vec::with_capacity(entries.len());
    for entry in entries {
        let student = Student::new(
            StudentId::new(&entry.student_id)?,
            entry.name,
            entry.email,
            entry.credential.map(SealedCredential::new),
        )?;
        let id = student.id().clone();
        store.insert_student(student).await?;
        enrolled.push(id);
    }
    Ok(enrolled)
}
