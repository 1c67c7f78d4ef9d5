//! Application state for the job service

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::DocuflowConfig;
use crate::error::Result;
use crate::processing::{JobQueue, ProcessingWorker};
use crate::retention::RetentionReaper;
use crate::storage::{InMemoryStore, JobStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: DocuflowConfig,
    /// Job records
    store: Arc<dyn JobStore>,
    /// Job queue for async processing
    job_queue: Arc<JobQueue>,
    /// Deletes downloaded files after the retention window
    reaper: Arc<RetentionReaper>,
    /// Stops the worker and the reaper
    shutdown: CancellationToken,
}

impl AppState {
    /// Create state backed by an in-memory store
    pub async fn new(config: DocuflowConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(InMemoryStore::new())).await
    }

    /// Create state around an existing store and start the background tasks
    pub async fn with_store(config: DocuflowConfig, store: Arc<dyn JobStore>) -> Result<Self> {
        tracing::info!("Initializing DocuFlow application state...");

        config.ensure_directories()?;
        tracing::info!(
            "Staging files in {}, outputs in {}",
            config.storage.staging_dir.display(),
            config.storage.output_dir.display()
        );

        let worker_count = config.processing.worker_count();
        let (job_queue, receiver) = JobQueue::new(worker_count, config.processing.queue_capacity);
        let job_queue = Arc::new(job_queue);
        tracing::info!("Job queue initialized with {} workers", worker_count);

        let reaper = Arc::new(RetentionReaper::new(config.retention.retention()));
        let shutdown = CancellationToken::new();

        let worker = ProcessingWorker::new(
            store.clone(),
            &job_queue,
            &config.processing,
            &config.storage,
        );
        tokio::spawn(worker.run(receiver, shutdown.child_token()));
        tokio::spawn(
            reaper
                .clone()
                .run(config.retention.sweep_interval(), shutdown.child_token()),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                job_queue,
                reaper,
                shutdown,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &DocuflowConfig {
        &self.inner.config
    }

    /// Get job store
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.inner.store
    }

    /// Get job queue
    pub fn job_queue(&self) -> &Arc<JobQueue> {
        &self.inner.job_queue
    }

    /// Get retention reaper
    pub fn reaper(&self) -> &Arc<RetentionReaper> {
        &self.inner.reaper
    }

    /// Stop the background worker and reaper
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}
