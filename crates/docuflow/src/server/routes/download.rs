//! Download endpoint for processed files

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::path::Path as FsPath;
use tokio_util::io::ReaderStream;

use super::parse_job_id;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{JobStatus, OutputFormat};

/// Name offered to the client: `processed_<stem>.<ext>`
pub fn download_file_name(original: &str, format: OutputFormat) -> String {
    let stem = FsPath::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "file".to_string());

    let stem: String = stem
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();

    format!("processed_{}.{}", stem, format.extension())
}

/// GET /api/download/:id - Stream the processed file as an attachment
pub async fn download_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let job_id = parse_job_id(&id)?;

    let job = state
        .store()
        .get(&job_id)
        .filter(|job| job.status == JobStatus::Completed)
        .ok_or_else(|| {
            tracing::debug!("Download requested for {} before completion", job_id);
            Error::NotReady("File not ready for download".to_string())
        })?;

    let artifacts = state.store().artifacts(&job_id).unwrap_or_default();
    let output_path = artifacts
        .output_path
        .clone()
        .ok_or_else(|| Error::NotReady("Processed file not found".to_string()))?;

    let file = match tokio::fs::File::open(&output_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Output for job {} is missing: {}", job_id, output_path.display());
            return Err(Error::NotReady("Processed file not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    let format = job.tool_type.download_format();
    let file_name = download_file_name(&job.file_name, format);

    tracing::info!(
        "Serving {} for job {} as {}",
        file_name,
        job_id,
        format.content_type()
    );

    // Registered when the response is built, not when the stream ends
    state.reaper().schedule(job_id, artifacts.paths());

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        body,
    )
        .into_response())
}
