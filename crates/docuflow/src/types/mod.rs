//! Core types for the job service

pub mod job;
pub mod tool;
pub mod user;

pub use job::{format_file_size, JobArtifacts, JobPatch, JobStatus, NewJob, ProcessingJob};
pub use tool::{OutputFormat, ToolCategory, ToolInfo, ToolType};
pub use user::{NewUser, User};
