//! Fixed-interval polling of the job list
//!
//! The poller re-fetches `GET /api/jobs` on every tick whether or not any job
//! is still running, and refetches immediately after its own mutations so
//! subscribers never keep showing a deleted or missing job.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{DocuflowClient, Download};
use crate::error::Result;
use crate::types::{ProcessingJob, ToolType};

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Cached, periodically refreshed job list
pub struct JobPoller {
    client: DocuflowClient,
    interval: Duration,
    jobs: watch::Sender<Vec<ProcessingJob>>,
    invalidated: Notify,
}

impl JobPoller {
    pub fn new(client: DocuflowClient, interval: Duration) -> Self {
        let (jobs, _) = watch::channel(Vec::new());
        Self {
            client,
            interval,
            jobs,
            invalidated: Notify::new(),
        }
    }

    pub fn client(&self) -> &DocuflowClient {
        &self.client
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Vec<ProcessingJob>> {
        self.jobs.subscribe()
    }

    /// Last fetched job list
    pub fn jobs(&self) -> Vec<ProcessingJob> {
        self.jobs.borrow().clone()
    }

    /// Fetch the job list now and publish it
    pub async fn refresh(&self) -> Result<Vec<ProcessingJob>> {
        let jobs = self.client.list_jobs().await?;
        self.jobs.send_replace(jobs.clone());
        Ok(jobs)
    }

    /// Ask the polling loop to refetch before the next tick
    pub fn invalidate(&self) {
        self.invalidated.notify_one();
    }

    /// Upload a file, then refresh the cached list
    pub async fn upload(
        &self,
        path: &Path,
        tool: &ToolType,
        options: Option<&serde_json::Value>,
    ) -> Result<ProcessingJob> {
        let job = self.client.upload(path, tool, options).await?;
        self.refresh_after_mutation().await;
        Ok(job)
    }

    /// Delete a job, then refresh the cached list
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client.delete_job(id).await?;
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Download a completed job's output
    pub async fn download(&self, id: Uuid) -> Result<Download> {
        self.client.download(id).await
    }

    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Refresh after mutation failed: {}", e);
            self.invalidate();
        }
    }

    /// Poll until cancelled. Fetch errors keep the previous snapshot.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.invalidated.notified() => {}
                _ = shutdown.cancelled() => break,
            }

            if let Err(e) = self.refresh().await {
                tracing::warn!("Failed to poll jobs from {}: {}", self.client.base_url(), e);
            }
        }
    }
}
