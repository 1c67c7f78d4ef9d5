//! Background processing with a bounded job queue

mod convert;
mod job_queue;
mod worker;

pub use convert::{convert, output_path_for, ConversionRequest};
pub use job_queue::{JobQueue, QueueStats, QueuedJob};
pub use worker::ProcessingWorker;
