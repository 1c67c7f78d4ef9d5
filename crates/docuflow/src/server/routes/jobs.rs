//! Job management and upload endpoints

use axum::{
    extract::{multipart::Field, multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::path::{Path as FsPath, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::parse_job_id;
use crate::error::{Error, Result};
use crate::processing::{QueueStats, QueuedJob};
use crate::server::state::AppState;
use crate::types::{format_file_size, JobPatch, NewJob, ProcessingJob, ToolType};

/// Uploaded file on disk; removed on drop unless persisted
struct StagedFile {
    path: PathBuf,
    file_name: String,
    size: u64,
    keep: bool,
}

impl StagedFile {
    fn persist(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

fn log_removal(path: &FsPath, result: std::io::Result<()>) {
    if let Err(e) = result {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove staging file {}: {}", path.display(), e);
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }

        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let result = tokio::fs::remove_file(&path).await;
                    log_removal(&path, result);
                });
            }
            Err(_) => {
                let result = std::fs::remove_file(&path);
                log_removal(&path, result);
            }
        }
    }
}

fn multipart_error(e: MultipartError, limit: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::validation(format!("Failed to read multipart field: {}", e.body_text()))
    }
}

/// Stream a file field to the staging directory, enforcing the size cap
async fn stage_file(mut field: Field<'_>, staging_dir: &FsPath, limit: usize) -> Result<StagedFile> {
    let file_name = field
        .file_name()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::validation("No file uploaded"))?;

    let mut staged = StagedFile {
        path: staging_dir.join(Uuid::new_v4().simple().to_string()),
        file_name,
        size: 0,
        keep: false,
    };

    let mut file = tokio::fs::File::create(&staged.path).await?;
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        staged.size += chunk.len() as u64;
        if staged.size > limit as u64 {
            tracing::warn!("Rejected upload {}: larger than {} bytes", staged.file_name, limit);
            return Err(Error::PayloadTooLarge { limit });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(staged)
}

/// Parse the optional `options` field; it must be a JSON object
fn parse_options(raw: &str) -> Result<Option<serde_json::Value>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| Error::validation(format!("Invalid options: {}", e)))?;
    match value {
        serde_json::Value::Object(_) => Ok(Some(value)),
        serde_json::Value::Null => Ok(None),
        _ => Err(Error::validation("Invalid options: expected a JSON object")),
    }
}

/// POST /api/jobs - Upload one file and queue it for processing
pub async fn create_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProcessingJob>)> {
    let limit = state.config().server.max_upload_size;
    let staging_dir = state.config().storage.staging_dir.clone();

    let mut staged: Option<StagedFile> = None;
    let mut tool_type: Option<String> = None;
    let mut options: Option<serde_json::Value> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                if staged.is_some() {
                    return Err(Error::validation("Only one file can be uploaded per job"));
                }
                staged = Some(stage_file(field, &staging_dir, limit).await?);
            }
            "toolType" => {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                let value = value.trim();
                if !value.is_empty() {
                    tool_type = Some(value.to_string());
                }
            }
            "options" => {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                options = parse_options(&value)?;
            }
            other => {
                tracing::debug!("Ignoring multipart field '{}'", other);
            }
        }
    }

    let staged = staged.ok_or_else(|| Error::validation("No file uploaded"))?;
    let tool_type = ToolType::from(tool_type.ok_or_else(|| Error::validation("Tool type is required"))?);

    let job = state.store().create(NewJob {
        file_name: staged.file_name.clone(),
        file_size: format_file_size(staged.size),
        tool_type: tool_type.clone(),
        metadata: options,
        input_path: Some(staged.path.clone()),
    });

    let queued = QueuedJob {
        job_id: job.id,
        tool_type,
        input_path: staged.path.clone(),
        file_name: job.file_name.clone(),
    };
    if let Err(e) = state.job_queue().submit(queued) {
        state.store().delete(&job.id);
        return Err(e);
    }

    let input_path = staged.persist();
    tracing::info!(
        "Created job {} for {} ({}, {}) staged at {}",
        job.id,
        job.file_name,
        job.file_size,
        job.tool_type,
        input_path.display()
    );

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs - List all jobs, newest first
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<ProcessingJob>> {
    Json(state.store().list(None))
}

/// GET /api/jobs/:id - Get a single job
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessingJob>> {
    let job_id = parse_job_id(&id)?;
    state
        .store()
        .get(&job_id)
        .map(Json)
        .ok_or(Error::JobNotFound(id))
}

/// PATCH /api/jobs/:id - Update status and/or progress
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<ProcessingJob>> {
    let job_id = parse_job_id(&id)?;
    let patch = JobPatch {
        status: patch.status,
        progress: patch.progress,
        ..Default::default()
    };

    match state.store().update(&job_id, patch)? {
        Some(job) => Ok(Json(job)),
        None => Err(Error::JobNotFound(id)),
    }
}

/// DELETE /api/jobs/:id - Remove a job record
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let job_id = parse_job_id(&id)?;
    if state.store().delete(&job_id) {
        tracing::info!("Deleted job {}", job_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::JobNotFound(id))
    }
}

/// GET /api/stats - Queue statistics
pub async fn queue_stats(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.job_queue().stats(state.store().as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options("").unwrap(), None);
        assert_eq!(parse_options("null").unwrap(), None);
        assert_eq!(
            parse_options(r#"{"pages":"1-3"}"#).unwrap(),
            Some(serde_json::json!({ "pages": "1-3" }))
        );
        assert!(parse_options("[1,2]").is_err());
        assert!(parse_options("{not json").is_err());
    }

    #[test]
    fn test_staged_file_removed_unless_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let dropped = dir.path().join("dropped");
        let kept = dir.path().join("kept");
        std::fs::write(&dropped, b"x").unwrap();
        std::fs::write(&kept, b"x").unwrap();

        drop(StagedFile {
            path: dropped.clone(),
            file_name: "a.pdf".to_string(),
            size: 1,
            keep: false,
        });
        let persisted = StagedFile {
            path: kept.clone(),
            file_name: "b.pdf".to_string(),
            size: 1,
            keep: false,
        }
        .persist();

        assert!(!dropped.exists());
        assert_eq!(persisted, kept);
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn test_staged_file_removed_in_background_on_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial");
        std::fs::write(&path, b"x").unwrap();

        drop(StagedFile {
            path: path.clone(),
            file_name: "a.pdf".to_string(),
            size: 1,
            keep: false,
        });

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while path.exists() {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
}
