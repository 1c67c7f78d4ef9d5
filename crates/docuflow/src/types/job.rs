//! Processing job record and its state transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use super::ToolType;
use crate::error::{Error, Result};

/// Job status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Status only moves forward; re-asserting the current status is allowed
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            JobStatus::Pending => true,
            JobStatus::Processing => next.is_terminal(),
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::validation(format!("Unknown job status: {}", other))),
        }
    }
}

/// A tracked request to turn one uploaded file into one output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub id: Uuid,
    /// Owner reference; always null while there is no authentication
    pub user_id: Option<Uuid>,
    pub file_name: String,
    /// Human-readable size captured at upload, e.g. `"12.50 KB"`
    pub file_size: String,
    pub tool_type: ToolType,
    pub status: JobStatus,
    /// Percentage, carried as a string on the wire
    #[serde(with = "progress_string")]
    pub progress: u8,
    pub input_file_url: Option<String>,
    pub output_file_url: Option<String>,
    /// User-supplied options
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    /// Build a fresh `pending` job from upload input
    pub fn new(input: NewJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            file_name: input.file_name,
            file_size: input.file_size,
            tool_type: input.tool_type,
            status: JobStatus::Pending,
            progress: 0,
            input_file_url: None,
            output_file_url: None,
            metadata: input.metadata,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Merge a patch into the record.
    ///
    /// Nothing is modified when the patch is rejected.
    pub fn apply(&mut self, patch: JobPatch) -> Result<()> {
        let next = patch.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition(format!(
                "job {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let still_processing =
            self.status == JobStatus::Processing && next == JobStatus::Processing;
        let progress = match (patch.progress, patch.min_progress) {
            (Some(progress), _) => Some(progress),
            (None, Some(floor)) if still_processing => Some(self.progress.max(floor)),
            (None, floor) => floor,
        };

        if let Some(progress) = progress {
            self.check_progress(next, progress)?;
        }

        let entering_completed = next == JobStatus::Completed && self.status != JobStatus::Completed;

        self.status = next;
        if let Some(progress) = progress {
            self.progress = progress;
        }
        if next == JobStatus::Failed {
            self.progress = 0;
        }
        if entering_completed && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        if let Some(url) = patch.input_file_url {
            self.input_file_url = Some(url);
        }
        if let Some(url) = patch.output_file_url {
            self.output_file_url = Some(url);
        }

        Ok(())
    }

    /// Progress only moves while processing, and never backwards.
    /// Completion may report 100 and failure 0.
    fn check_progress(&self, next: JobStatus, progress: u8) -> Result<()> {
        if progress > 100 {
            return Err(Error::InvalidTransition(format!(
                "progress {} is above 100",
                progress
            )));
        }
        if progress == self.progress {
            return Ok(());
        }

        let allowed = match next {
            JobStatus::Processing => {
                self.status != JobStatus::Processing || progress > self.progress
            }
            JobStatus::Completed => progress == 100,
            JobStatus::Failed => progress == 0,
            JobStatus::Pending => false,
        };
        if !allowed {
            return Err(Error::InvalidTransition(format!(
                "job {} cannot change progress from {} to {} while {}",
                self.id, self.progress, progress, next
            )));
        }
        Ok(())
    }
}

/// Input for creating a job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub file_name: String,
    pub file_size: String,
    pub tool_type: ToolType,
    pub metadata: Option<serde_json::Value>,
    /// Staging file written by the upload endpoint
    pub input_path: Option<PathBuf>,
}

/// Partial update of a job.
///
/// Only `status` and `progress` are accepted from clients; the URL fields
/// are set by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "progress_string::option")]
    pub progress: Option<u8>,
    /// Pipeline checkpoint: raise progress to at least this value, never lower it
    #[serde(skip)]
    pub min_progress: Option<u8>,
    #[serde(skip)]
    pub input_file_url: Option<String>,
    #[serde(skip)]
    pub output_file_url: Option<String>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_min_progress(mut self, progress: u8) -> Self {
        self.min_progress = Some(progress);
        self
    }

    pub fn with_input_file_url(mut self, url: impl Into<String>) -> Self {
        self.input_file_url = Some(url.into());
        self
    }

    pub fn with_output_file_url(mut self, url: impl Into<String>) -> Self {
        self.output_file_url = Some(url.into());
        self
    }
}

/// File-system bookkeeping for a job, never serialized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobArtifacts {
    /// Uploaded staging file
    pub input_path: Option<PathBuf>,
    /// Processed output file
    pub output_path: Option<PathBuf>,
}

impl JobArtifacts {
    /// All paths currently recorded
    pub fn paths(&self) -> Vec<PathBuf> {
        self.output_path
            .iter()
            .chain(self.input_path.iter())
            .cloned()
            .collect()
    }
}

/// Format a byte count the way uploads are labelled, e.g. `"1.50 KB"`
pub fn format_file_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Serde helpers for percentages sent as strings (`"25"`), accepting numbers too
pub(crate) mod progress_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawProgress {
        Text(String),
        Number(u64),
    }

    fn parse<E: de::Error>(raw: RawProgress) -> Result<u8, E> {
        let value = match raw {
            RawProgress::Text(text) => text
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("invalid progress '{}'", text)))?,
            RawProgress::Number(n) => n,
        };
        if value > 100 {
            return Err(E::custom(format!("progress {} is above 100", value)));
        }
        Ok(value as u8)
    }

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        parse(RawProgress::deserialize(deserializer)?)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<u8>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&v.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u8>, D::Error> {
            Option::<RawProgress>::deserialize(deserializer)?
                .map(parse)
                .transpose()
        }
    }
}
