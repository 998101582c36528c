// src/main.rs
mod pipeline;
mod portal;
mod storage;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use portal::models::{ArchiveJob, JobOutcome, PortalConfig, DEFAULT_DOWNLOAD_DIR, REPORT_PAGE_URL};
use storage::ReportStore;
use utils::error::PortalError;
use utils::logging::{RunLog, RUN_LOG_FILE};
use utils::AppError;

/// Command Line Interface for the NSE daily-report ingestor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder the browser downloads into (defaults to the platform download folder)
    #[arg(short, long)]
    download_dir: Option<PathBuf>,

    /// Report listing page to drive
    #[arg(long, default_value = REPORT_PAGE_URL)]
    url: String,

    /// Maximum number of download attempts before giving up
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Seconds to wait for each page control to become interactable
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,

    /// Seconds to wait for the download manager after triggering the download
    #[arg(long, default_value_t = 20)]
    settle_secs: u64,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Ingest an already-downloaded archive instead of driving the browser
    #[arg(short, long)]
    archive: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting run for args: {:?}", args);

    let download_dir = args
        .download_dir
        .clone()
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.clone());
    let config = PortalConfig {
        report_url: args.url.clone(),
        download_dir: download_dir.clone(),
        headless: !args.headed,
        timeout: Duration::from_secs(args.timeout_secs),
        settle: Duration::from_secs(args.settle_secs),
        max_attempts: args.max_attempts,
        ..PortalConfig::default()
    };

    // 3. Initialize storage
    let store = ReportStore::new(&download_dir)?;

    // 4. Run log for this retrieve+ingest cycle
    let mut log = RunLog::new();

    // 5. Obtain the archive: the one given on the CLI, or drive the portal
    let (job, archive_path) = match &args.archive {
        Some(path) => {
            log.success(format!("Using provided archive {}", path.display()));
            let mut job = ArchiveJob::new(&config);
            job.outcome = JobOutcome::Success(path.clone());
            (job, path.clone())
        }
        None => {
            let job = portal::retrieve(&config, &mut log).await;
            match job.archive_path() {
                Some(path) => {
                    let path = path.to_path_buf();
                    (job, path)
                }
                None => {
                    return Err(AppError::Portal(PortalError::AttemptsExhausted(
                        config.max_attempts,
                    )));
                }
            }
        }
    };

    // 6. Ingest into today's run folder
    let today = chrono::Local::now().date_naive();
    let base_dir = store.create_run_dir(today)?;
    log.attach_file(&base_dir.join(RUN_LOG_FILE))?;

    let report = pipeline::ingest(&archive_path, &base_dir, &mut log)?;

    // 7. Persist the run summary for the dashboard/notification collaborators
    store.save_run_summary(&base_dir, &job, &report, &log)?;

    if !report.all_valid() {
        tracing::warn!(
            "{} file(s) failed post-classification validation, see {}",
            report.validation_failed(),
            base_dir.join(RUN_LOG_FILE).display()
        );
    }

    tracing::info!(
        "Run finished. {} files classified, {} duplicates removed, validation {}/{} passed",
        report.files_classified,
        report.duplicates_removed,
        report.validation_passed(),
        report.validation.len()
    );

    Ok(())
}
