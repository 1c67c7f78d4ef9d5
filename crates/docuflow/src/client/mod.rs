//! HTTP client for the job API and a polling job list

mod poller;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::QueueStats;
use crate::types::{JobPatch, ProcessingJob, ToolInfo, ToolType};

pub use poller::{JobPoller, DEFAULT_POLL_INTERVAL};

/// A downloaded output file
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Client for a DocuFlow server
#[derive(Debug, Clone)]
pub struct DocuflowClient {
    base_url: String,
    http: reqwest::Client,
}

impl DocuflowClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into `Error::Api` with the server's message
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(text);

        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// GET /api/jobs
    pub async fn list_jobs(&self) -> Result<Vec<ProcessingJob>> {
        let response = self.http.get(self.url("/api/jobs")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// GET /api/jobs/:id
    pub async fn get_job(&self, id: Uuid) -> Result<ProcessingJob> {
        let response = self.http.get(self.url(&format!("/api/jobs/{}", id))).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// POST /api/jobs with a file from disk
    pub async fn upload(
        &self,
        path: &Path,
        tool: &ToolType,
        options: Option<&serde_json::Value>,
    ) -> Result<ProcessingJob> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::validation(format!("Not a file: {}", path.display())))?;
        let data = tokio::fs::read(path).await?;
        self.upload_bytes(&file_name, data, tool, options).await
    }

    /// POST /api/jobs with in-memory content
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        data: Vec<u8>,
        tool: &ToolType,
        options: Option<&serde_json::Value>,
    ) -> Result<ProcessingJob> {
        let mut form = Form::new()
            .part("file", Part::bytes(data).file_name(file_name.to_string()))
            .text("toolType", tool.to_string());
        if let Some(options) = options {
            form = form.text("options", serde_json::to_string(options)?);
        }

        let response = self
            .http
            .post(self.url("/api/jobs"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// PATCH /api/jobs/:id
    pub async fn update_job(&self, id: Uuid, patch: &JobPatch) -> Result<ProcessingJob> {
        let response = self
            .http
            .patch(self.url(&format!("/api/jobs/{}", id)))
            .json(patch)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// DELETE /api/jobs/:id
    pub async fn delete_job(&self, id: Uuid) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/api/jobs/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// GET /api/download/:id
    pub async fn download(&self, id: Uuid) -> Result<Download> {
        let response = self
            .http
            .get(self.url(&format!("/api/download/{}", id)))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let headers = response.headers();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| format!("processed_{}", id));

        Ok(Download {
            file_name,
            content_type,
            bytes: response.bytes().await?,
        })
    }

    /// GET /api/tools
    pub async fn tools(&self) -> Result<Vec<ToolInfo>> {
        let response = self.http.get(self.url("/api/tools")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// GET /api/stats
    pub async fn stats(&self) -> Result<QueueStats> {
        let response = self.http.get(self.url("/api/stats")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

/// Extract `filename` from a `Content-Disposition` value
pub fn attachment_file_name(disposition: &str) -> Option<String> {
    disposition.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_file_name() {
        assert_eq!(
            attachment_file_name("attachment; filename=\"processed_report.docx\""),
            Some("processed_report.docx".to_string())
        );
        assert_eq!(
            attachment_file_name("attachment;filename=out.pdf"),
            Some("out.pdf".to_string())
        );
        assert_eq!(attachment_file_name("inline"), None);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = DocuflowClient::new("http://localhost:5000/");
        assert_eq!(client.url("/api/jobs"), "http://localhost:5000/api/jobs");
    }
}
