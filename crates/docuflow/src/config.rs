//! Configuration for the job service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable pointing at a TOML configuration file
pub const CONFIG_ENV: &str = "DOCUFLOW_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocuflowConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Staging and output directories
    #[serde(default)]
    pub storage: StorageConfig,
    /// Processing pipeline configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// File retention configuration
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl DocuflowConfig {
    /// Parse a TOML configuration file. Missing sections take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from `DOCUFLOW_CONFIG` (if set) and apply
    /// `DOCUFLOW_HOST` / `DOCUFLOW_PORT` overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };

        if let Ok(host) = std::env::var("DOCUFLOW_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("DOCUFLOW_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid DOCUFLOW_PORT '{}': {}", port, e)))?;
        }

        Ok(config)
    }

    /// Create the staging and output directories if they do not exist
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.storage.staging_dir)?;
        std::fs::create_dir_all(&self.storage.output_dir)?;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum size of an uploaded file in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Where uploaded and processed files live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for uploaded (staging) files
    pub staging_dir: PathBuf,
    /// Directory for processed output files
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Jobs converted at the same time (default: CPU count, max 8)
    pub max_concurrent_jobs: Option<usize>,
    /// Jobs waiting for a worker before uploads are refused
    pub queue_capacity: usize,
    /// Delay between accepting an upload and starting its conversion
    pub start_delay_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: None, // Auto-detect from CPU count
            queue_capacity: 1000,
            start_delay_ms: 1000,
        }
    }
}

impl ProcessingConfig {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.max_concurrent_jobs
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

/// Retention of files after download
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// How long files stay on disk after the first download (default: 1 hour)
    pub retention_secs: u64,
    /// How often the reaper looks for expired files
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl RetentionConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocuflowConfig::default();
        assert_eq!(config.server.max_upload_size, 50 * 1024 * 1024);
        assert_eq!(config.retention.retention(), Duration::from_secs(3600));
        assert_eq!(config.storage.staging_dir, PathBuf::from("uploads"));
        assert!(config.processing.worker_count() >= 1);
    }

    #[test]
    fn test_partial_toml() {
        let config = DocuflowConfig::from_toml(
            r#"
            [server]
            port = 8088

            [processing]
            max_concurrent_jobs = 2
            start_delay_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.processing.worker_count(), 2);
        assert_eq!(config.processing.queue_capacity, 1000);
        assert_eq!(config.retention.sweep_interval_secs, 60);
    }

    #[test]
    fn test_invalid_toml() {
        let err = DocuflowConfig::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docuflow.toml");
        std::fs::write(&path, "[retention]\nretention_secs = 5\n").unwrap();

        let config = DocuflowConfig::from_file(&path).unwrap();
        assert_eq!(config.retention.retention_secs, 5);
    }
}
