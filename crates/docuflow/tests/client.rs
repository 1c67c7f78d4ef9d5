//! Client and poller against a live server

use docuflow::{build_router, AppState, DocuflowClient, DocuflowConfig, JobPoller, JobStatus, ToolType};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn spawn_server(start_delay_ms: u64) -> (DocuflowClient, AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DocuflowConfig::default();
    config.storage.staging_dir = dir.path().join("uploads");
    config.storage.output_dir = dir.path().join("outputs");
    config.processing.start_delay_ms = start_delay_ms;

    let state = AppState::new(config).await.unwrap();
    let router = build_router(&state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (DocuflowClient::new(format!("http://{}", addr)), state, dir)
}

#[tokio::test]
async fn test_client_upload_and_download() {
    let (client, state, _dir) = spawn_server(0).await;

    let job = client
        .upload_bytes("notes.pdf", b"%PDF-1.4 notes".to_vec(), &ToolType::WatermarkPdf, None)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let job = loop {
        let job = client.get_job(job.id).await.unwrap();
        if job.status.is_terminal() {
            break job;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(job.status, JobStatus::Completed);

    let download = client.download(job.id).await.unwrap();
    assert_eq!(download.file_name, "processed_notes.pdf");
    assert_eq!(download.content_type, "application/pdf");
    assert_eq!(&download.bytes[..], b"%PDF-1.4 notes");

    let err = client.download(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());

    state.shutdown();
}

#[tokio::test]
async fn test_client_reports_server_message() {
    let (client, state, _dir) = spawn_server(0).await;

    let err = client.get_job(uuid::Uuid::new_v4()).await.unwrap_err();
    match err {
        docuflow::Error::Api { status, message } => {
            assert_eq!(status, 404);
            assert!(message.starts_with("Job not found"));
        }
        other => panic!("unexpected error: {other}"),
    }

    state.shutdown();
}

#[tokio::test]
async fn test_poller_sees_uploads_and_deletes() {
    let (client, state, dir) = spawn_server(1000).await;
    let poller = Arc::new(JobPoller::new(client, Duration::from_millis(50)));
    let mut updates = poller.subscribe();

    let path = dir.path().join("upload.pdf");
    std::fs::write(&path, b"%PDF-1.4 poll").unwrap();
    let job = poller.upload(&path, &ToolType::SplitPdf, None).await.unwrap();

    // Refreshed right after the upload, without waiting for a tick
    assert!(poller.jobs().iter().any(|j| j.id == job.id));

    poller.delete(job.id).await.unwrap();
    assert!(poller.jobs().is_empty());

    updates.borrow_and_update();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(poller.clone().run(shutdown.clone()));

    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(updates.borrow().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
    state.shutdown();
}
