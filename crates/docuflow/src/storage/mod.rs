//! Storage abstractions for jobs and users
//!
//! Endpoints and the pipeline only see the traits; `InMemoryStore` is the
//! backing used by the server and the tests.

mod memory;

use std::path::PathBuf;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{JobArtifacts, JobPatch, NewJob, NewUser, ProcessingJob, User};

pub use memory::InMemoryStore;

/// Keyed record set of processing jobs
pub trait JobStore: Send + Sync {
    /// Get a job by ID
    fn get(&self, id: &Uuid) -> Option<ProcessingJob>;

    /// List jobs, newest first, optionally restricted to one owner
    fn list(&self, user_id: Option<&Uuid>) -> Vec<ProcessingJob>;

    /// Create a `pending` job; never fails
    fn create(&self, input: NewJob) -> ProcessingJob;

    /// Merge a patch into an existing job.
    ///
    /// Returns `Ok(None)` when the job does not exist, which callers must
    /// check; an illegal transition is an error.
    fn update(&self, id: &Uuid, patch: JobPatch) -> Result<Option<ProcessingJob>>;

    /// Remove a job record. Files on disk are left alone.
    fn delete(&self, id: &Uuid) -> bool;

    /// Internal file paths of a job
    fn artifacts(&self, id: &Uuid) -> Option<JobArtifacts>;

    /// Record the processed output file. Returns false if the job is gone.
    fn set_output_path(&self, id: &Uuid, path: PathBuf) -> bool;
}

/// Keyed record set of users
pub trait UserStore: Send + Sync {
    fn get_user(&self, id: &Uuid) -> Option<User>;

    fn get_user_by_username(&self, username: &str) -> Option<User>;

    fn create_user(&self, input: NewUser) -> User;
}
