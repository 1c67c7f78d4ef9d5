//! docuflow: document processing job service
//!
//! Users upload a file with a tool selector, poll the job list while the
//! background pipeline converts it, then download the result. Downloaded
//! files are deleted after a retention window.

pub mod client;
pub mod config;
pub mod error;
pub mod processing;
pub mod retention;
pub mod server;
pub mod storage;
pub mod types;

pub use client::{DocuflowClient, JobPoller};
pub use config::DocuflowConfig;
pub use error::{Error, Result};
pub use server::{build_router, state::AppState, DocuflowServer};
pub use types::{JobPatch, JobStatus, ProcessingJob, ToolType};
