//! DocuFlow command-line client
//!
//! Run with: cargo run -p docuflow --features cli --bin docuflow -- --help

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use docuflow::client::DEFAULT_POLL_INTERVAL;
use docuflow::{DocuflowClient, JobPoller, JobStatus, ProcessingJob, ToolType};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docuflow", version, about = "Upload, track and download document jobs")]
struct Cli {
    /// Server base URL
    #[arg(long, global = true, default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a file and create a job
    Upload {
        file: PathBuf,
        /// Tool identifier, e.g. pdf-to-word
        #[arg(long, short)]
        tool: String,
        /// Tool options as a JSON object
        #[arg(long)]
        options: Option<String>,
        /// Wait until the job finishes
        #[arg(long)]
        wait: bool,
    },
    /// List all jobs, newest first
    List {
        /// Only show jobs in this status (pending, processing, completed, failed)
        #[arg(long)]
        status: Option<JobStatus>,
    },
    /// Show one job
    Get { id: Uuid },
    /// Poll the job list and print changes until Ctrl+C
    Watch {
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
        interval_ms: u64,
    },
    /// Download a completed job's output
    Download {
        id: Uuid,
        /// Destination file or directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a job
    Delete { id: Uuid },
    /// List available tools
    Tools,
    /// Show queue statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docuflow=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = DocuflowClient::new(cli.server.clone());

    match cli.command {
        Command::Upload {
            file,
            tool,
            options,
            wait,
        } => {
            let options = options
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()
                .context("--options must be valid JSON")?;
            let tool = ToolType::from(tool);

            let job = client
                .upload(&file, &tool, options.as_ref())
                .await
                .with_context(|| format!("Failed to upload {}", file.display()))?;
            println!("{} Created job {}", style("✓").green(), style(job.id).bold());

            if wait {
                let job = wait_for_job(&client, job.id).await?;
                print_job(&job);
                if job.status == JobStatus::Failed {
                    bail!("Job {} failed", job.id);
                }
            }
        }
        Command::List { status } => {
            let jobs: Vec<ProcessingJob> = client
                .list_jobs()
                .await?
                .into_iter()
                .filter(|job| status.map_or(true, |s| job.status == s))
                .collect();
            if jobs.is_empty() {
                println!("{}", style("No jobs").dim());
            }
            for job in &jobs {
                print_job(job);
            }
        }
        Command::Get { id } => {
            let job = client.get_job(id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Watch { interval_ms } => {
            watch_jobs(client, Duration::from_millis(interval_ms.max(100))).await?;
        }
        Command::Download { id, output } => {
            let job = client.get_job(id).await?;
            println!("{} {}", style(job.tool_type.download_label()).cyan(), job.file_name);

            let download = client.download(id).await?;
            let target = match output {
                Some(path) if path.is_dir() => path.join(&download.file_name),
                Some(path) => path,
                None => PathBuf::from(&download.file_name),
            };
            tokio::fs::write(&target, &download.bytes)
                .await
                .with_context(|| format!("Failed to write {}", target.display()))?;
            println!(
                "{} Saved {} ({} bytes, {})",
                style("✓").green(),
                target.display(),
                download.bytes.len(),
                download.content_type
            );
        }
        Command::Delete { id } => {
            client.delete_job(id).await?;
            println!("{} Deleted job {}", style("✓").green(), id);
        }
        Command::Tools => {
            for tool in client.tools().await? {
                println!(
                    "{:<20} {:<20} .{}",
                    style(tool.id.as_str()).bold(),
                    tool.name,
                    tool.download_extension
                );
            }
        }
        Command::Stats => {
            let stats = client.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn print_job(job: &ProcessingJob) {
    let status = match job.status {
        JobStatus::Pending => style(job.status.to_string()).yellow(),
        JobStatus::Processing => style(job.status.to_string()).cyan(),
        JobStatus::Completed => style(job.status.to_string()).green(),
        JobStatus::Failed => style(job.status.to_string()).red(),
    };
    println!(
        "{}  {:<11} {:>3}%  {:<18} {} ({})",
        job.id, status, job.progress, job.tool_type, job.file_name, job.file_size
    );
}

async fn wait_for_job(client: &DocuflowClient, id: Uuid) -> Result<ProcessingJob> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.green/238}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(80));

    loop {
        let job = client.get_job(id).await?;
        bar.set_position(job.progress as u64);
        bar.set_message(job.status.to_string());

        if job.status.is_terminal() {
            bar.finish_and_clear();
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn watch_jobs(client: DocuflowClient, interval: Duration) -> Result<()> {
    let poller = Arc::new(JobPoller::new(client, interval));
    let mut updates = poller.subscribe();
    let shutdown = CancellationToken::new();

    poller.refresh().await?;
    let handle = tokio::spawn(poller.clone().run(shutdown.clone()));

    let mut last: Vec<ProcessingJob> = Vec::new();
    loop {
        let jobs = updates.borrow_and_update().clone();
        if jobs != last {
            println!("{}", style(format!("── {} job(s) ──", jobs.len())).dim());
            for job in &jobs {
                print_job(job);
            }
            last = jobs;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    shutdown.cancel();
    handle.await?;
    Ok(())
}
