//! API routes for the job service

pub mod download;
pub mod jobs;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ToolInfo, ToolType};

/// Room for the non-file multipart fields on top of the file size cap
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Jobs - uploads get the larger body limit
        .route(
            "/jobs",
            get(jobs::list_jobs)
                .post(jobs::create_job)
                .layer(DefaultBodyLimit::max(max_upload_size.saturating_add(MULTIPART_OVERHEAD))),
        )
        .route(
            "/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/download/:id", get(download::download_job))
        .route("/stats", get(jobs::queue_stats))
        .route("/tools", get(list_tools))
        .route("/info", get(info))
}

/// Job ids that are not UUIDs cannot exist
pub(crate) fn parse_job_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::JobNotFound(raw.to_string()))
}

/// GET /api/tools - Tool catalog
async fn list_tools() -> Json<Vec<ToolInfo>> {
    Json(ToolType::CATALOG.iter().map(ToolInfo::from).collect())
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "docuflow",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document processing jobs with polling and timed file retention",
        "endpoints": {
            "GET /api/jobs": "List jobs, newest first",
            "POST /api/jobs": "Upload a file (multipart: file, toolType, options)",
            "GET /api/jobs/:id": "Get a job",
            "PATCH /api/jobs/:id": "Update job status/progress",
            "DELETE /api/jobs/:id": "Delete a job record",
            "GET /api/download/:id": "Download the processed file",
            "GET /api/stats": "Queue statistics",
            "GET /api/tools": "Tool catalog"
        }
    }))
}
