//! Timed deletion of downloaded files
//!
//! A download registers the job's files with a deadline; a single background
//! sweep removes everything past its deadline. Entries are keyed by job, so a
//! second download of the same job does not extend or duplicate the deadline,
//! and deleting the job record does not cancel the cleanup.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct RetentionEntry {
    paths: Vec<PathBuf>,
    deadline: DateTime<Utc>,
}

/// Centralized reaper for files past their retention deadline
pub struct RetentionReaper {
    entries: DashMap<Uuid, RetentionEntry>,
    retention: Duration,
}

impl RetentionReaper {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
        }
    }

    /// Register a job's files for deletion after the retention window.
    ///
    /// Returns the deadline in effect; an existing registration is kept.
    pub fn schedule(&self, job_id: Uuid, paths: Vec<PathBuf>) -> DateTime<Utc> {
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::hours(1));

        let entry = self.entries.entry(job_id).or_insert_with(|| {
            let deadline = Utc::now() + retention;
            tracing::info!(
                "Files for job {} scheduled for deletion at {}",
                job_id,
                deadline.to_rfc3339()
            );
            RetentionEntry { paths, deadline }
        });
        entry.deadline
    }

    /// Deadline registered for a job, if any
    pub fn deadline(&self, job_id: &Uuid) -> Option<DateTime<Utc>> {
        self.entries.get(job_id).map(|e| e.deadline)
    }

    /// Number of jobs waiting for cleanup
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Delete files of every entry whose deadline is at or before `now`.
    ///
    /// Returns the number of files removed. Failures are logged and dropped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for job_id in expired {
            let Some((_, entry)) = self.entries.remove(&job_id) else {
                continue;
            };

            tracing::info!("Cleaning up files for job {}", job_id);
            for path in entry.paths {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        removed += 1;
                        tracing::info!("Deleted {}", path.display());
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!("File cleanup error for {}: {}", path.display(), e);
                    }
                }
            }
        }

        removed
    }

    /// Sweep periodically until cancelled
    pub async fn run(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep(Utc::now()).await;
                }
                _ = shutdown.cancelled() => break,
            }
        }

        tracing::debug!("Retention reaper stopped");
    }
}
