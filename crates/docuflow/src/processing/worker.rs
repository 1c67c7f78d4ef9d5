//! Background worker driving jobs through the pipeline

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::convert::{convert, ConversionRequest};
use super::job_queue::{JobQueue, QueuedJob};
use crate::config::{ProcessingConfig, StorageConfig};
use crate::error::Result;
use crate::storage::JobStore;
use crate::types::{JobPatch, JobStatus};

/// Progress checkpoints reported by the pipeline
const PROGRESS_STARTED: u8 = 25;
const PROGRESS_CONVERTED: u8 = 75;
const PROGRESS_DONE: u8 = 100;

/// Outcome of one pipeline run
#[derive(Debug, PartialEq, Eq)]
enum JobOutcome {
    Completed(PathBuf),
    /// The record was deleted while the job was running
    Vanished,
}

/// Worker for converting uploads in the background
pub struct ProcessingWorker {
    store: Arc<dyn JobStore>,
    output_dir: PathBuf,
    start_delay: Duration,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl ProcessingWorker {
    /// Create a new processing worker
    pub fn new(
        store: Arc<dyn JobStore>,
        job_queue: &JobQueue,
        processing: &ProcessingConfig,
        storage: &StorageConfig,
    ) -> Self {
        let worker_count = job_queue.worker_count();

        tracing::info!(
            "Worker configured: {} concurrent jobs, {}ms start delay",
            worker_count,
            processing.start_delay_ms
        );

        Self {
            store,
            output_dir: storage.output_dir.clone(),
            start_delay: processing.start_delay(),
            permits: Arc::new(Semaphore::new(worker_count.max(1))),
            in_flight: job_queue.in_flight_ref(),
        }
    }

    /// Start processing jobs from the queue until cancelled or the queue closes
    pub async fn run(self, mut receiver: mpsc::Receiver<QueuedJob>, shutdown: CancellationToken) {
        let worker = Arc::new(self);
        tracing::info!("Processing worker started");

        loop {
            let job = tokio::select! {
                job = receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            };

            // Waiting for a permit here keeps later jobs queued in the channel
            let permit = tokio::select! {
                permit = worker.permits.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
                _ = shutdown.cancelled() => break,
            };

            let worker = worker.clone();
            tokio::spawn(async move {
                let _permit = permit;
                worker.process(job).await;
            });
        }

        tracing::info!("Processing worker stopped");
    }

    /// Run one job to a terminal state
    async fn process(&self, job: QueuedJob) {
        let job_id = job.job_id;

        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }

        tracing::info!(
            "Starting job {} ({}, {})",
            job_id,
            job.tool_type,
            job.input_path.display()
        );

        match self.execute(&job).await {
            Ok(JobOutcome::Completed(output)) => {
                tracing::info!("Job {} completed: {}", job_id, output.display());
            }
            Ok(JobOutcome::Vanished) => {
                tracing::warn!("Job {} was deleted while processing", job_id);
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", job_id, e);
                self.mark_failed(job_id);
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn execute(&self, job: &QueuedJob) -> Result<JobOutcome> {
        let job_id = job.job_id;
        let input_name = job
            .input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let started = self.store.update(
            &job_id,
            JobPatch::status(JobStatus::Processing)
                .with_min_progress(PROGRESS_STARTED)
                .with_input_file_url(input_name),
        )?;
        if started.is_none() {
            return Ok(JobOutcome::Vanished);
        }

        let request = ConversionRequest {
            job_id,
            tool_type: job.tool_type.clone(),
            input_path: job.input_path.clone(),
            file_name: job.file_name.clone(),
        };
        let output = convert(&request, &self.output_dir).await?;

        // From here on the output file is removed unless the job completes
        match self.record_output(job_id, &output) {
            Ok(true) => Ok(JobOutcome::Completed(output)),
            Ok(false) => {
                self.discard_output(&output).await;
                Ok(JobOutcome::Vanished)
            }
            Err(e) => {
                self.discard_output(&output).await;
                Err(e)
            }
        }
    }

    /// Attach the output to the job and complete it. False if the job is gone.
    fn record_output(&self, job_id: Uuid, output: &Path) -> Result<bool> {
        let converted = self.store.update(
            &job_id,
            JobPatch::status(JobStatus::Processing).with_min_progress(PROGRESS_CONVERTED),
        )?;
        if converted.is_none() || !self.store.set_output_path(&job_id, output.to_path_buf()) {
            return Ok(false);
        }

        let completed = self.store.update(
            &job_id,
            JobPatch::status(JobStatus::Completed)
                .with_progress(PROGRESS_DONE)
                .with_output_file_url(format!("/api/download/{}", job_id)),
        )?;
        Ok(completed.is_some())
    }

    fn mark_failed(&self, job_id: Uuid) {
        match self.store.update(&job_id, JobPatch::status(JobStatus::Failed)) {
            Ok(Some(_)) => {}
            Ok(None) => tracing::warn!("Job {} vanished before it could be marked failed", job_id),
            Err(e) => tracing::warn!("Could not mark job {} failed: {}", job_id, e),
        }
    }

    /// Output of a job whose record no longer exists
    async fn discard_output(&self, output: &Path) {
        if let Err(e) = tokio::fs::remove_file(output).await {
            tracing::warn!("Failed to remove orphaned output {}: {}", output.display(), e);
        }
    }
}
