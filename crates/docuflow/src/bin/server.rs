//! DocuFlow server binary
//!
//! Run with: cargo run -p docuflow --bin docuflow-server

use docuflow::{DocuflowConfig, DocuflowServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docuflow=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DocuflowConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Staging dir: {}", config.storage.staging_dir.display());
    tracing::info!("  - Output dir: {}", config.storage.output_dir.display());
    tracing::info!("  - Workers: {}", config.processing.worker_count());
    tracing::info!("  - Max upload size: {} bytes", config.server.max_upload_size);
    tracing::info!("  - Retention after download: {}s", config.retention.retention_secs);

    let server = DocuflowServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/jobs          - Upload a file for processing");
    println!("  GET    /api/jobs          - List jobs");
    println!("  GET    /api/jobs/:id      - Job status");
    println!("  DELETE /api/jobs/:id      - Delete a job");
    println!("  GET    /api/download/:id  - Download processed file");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
