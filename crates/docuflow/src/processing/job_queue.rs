//! Job queue feeding the processing workers
//!
//! Uploads submit work here instead of spawning their own tasks; the channel
//! is bounded and the worker caps how many conversions run at once.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::JobStore;
use crate::types::{JobStatus, ToolType};

/// Work item for the pipeline
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub tool_type: ToolType,
    pub input_path: PathBuf,
    pub file_name: String,
}

/// Job queue handle shared by the upload endpoint and the worker
pub struct JobQueue {
    /// Channel for sending jobs to workers
    sender: mpsc::Sender<QueuedJob>,
    /// Number of concurrent conversions
    worker_count: usize,
    /// Jobs submitted but not yet finished
    in_flight: Arc<AtomicUsize>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` waiting jobs
    pub fn new(worker_count: usize, capacity: usize) -> (Self, mpsc::Receiver<QueuedJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let queue = Self {
            sender,
            worker_count,
            in_flight: Arc::new(AtomicUsize::new(0)),
        };

        (queue, receiver)
    }

    /// Hand a job to the workers without waiting for it to run
    pub fn submit(&self, job: QueuedJob) -> Result<()> {
        let job_id = job.job_id;

        // Counted before sending so the worker's decrement cannot run first
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.sender.try_send(job) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => Error::QueueFull,
                mpsc::error::TrySendError::Closed(_) => {
                    Error::internal("Processing workers have stopped")
                }
            });
        }

        tracing::info!("Queued job {}", job_id);
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Counter decremented by the worker when a job finishes
    pub fn in_flight_ref(&self) -> Arc<AtomicUsize> {
        self.in_flight.clone()
    }

    /// Queue and job statistics
    pub fn stats(&self, store: &dyn JobStore) -> QueueStats {
        let jobs = store.list(None);
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();

        QueueStats {
            total_jobs: jobs.len(),
            pending: count(JobStatus::Pending),
            processing: count(JobStatus::Processing),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            worker_count: self.worker_count,
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total_jobs: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
    pub worker_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued() -> QueuedJob {
        QueuedJob {
            job_id: Uuid::new_v4(),
            tool_type: ToolType::SplitPdf,
            input_path: PathBuf::from("uploads/x"),
            file_name: "x.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_delivers_to_receiver() {
        let (queue, mut receiver) = JobQueue::new(2, 4);
        let job = queued();
        queue.submit(job.clone()).unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.job_id, job.job_id);
        assert_eq!(queue.in_flight_ref().load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_full_queue_is_rejected() {
        let (queue, _receiver) = JobQueue::new(1, 1);
        queue.submit(queued()).unwrap();
        assert!(matches!(queue.submit(queued()), Err(Error::QueueFull)));
        assert_eq!(queue.in_flight_ref().load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_queue_is_internal_error() {
        let (queue, receiver) = JobQueue::new(1, 1);
        drop(receiver);
        assert!(matches!(queue.submit(queued()), Err(Error::Internal(_))));
        assert_eq!(queue.in_flight_ref().load(Ordering::SeqCst), 0);
    }
}
