// src/portal/models.rs
#![allow(dead_code)]
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;

/// Report listing page the driver navigates to.
pub const REPORT_PAGE_URL: &str = "https://www.nseindia.com/all-reports";

/// Filename the portal's bulk download writes into the download folder.
pub const BULK_ARCHIVE_NAME: &str = "Reports-Daily-Multiple.zip";

/// Platform download folder, used when no `--download-dir` is given.
pub static DEFAULT_DOWNLOAD_DIR: Lazy<PathBuf> =
    Lazy::new(|| dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")));

/// Everything one retrieval attempt needs, enumerated up front.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub report_url: String,
    pub download_dir: PathBuf,
    pub archive_name: String,
    pub headless: bool,
    /// Bound on each wait for a page control to become interactable.
    pub timeout: Duration,
    /// Fixed wait for the browser's download manager to finish writing.
    pub settle: Duration,
    pub max_attempts: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            report_url: REPORT_PAGE_URL.to_string(),
            download_dir: DEFAULT_DOWNLOAD_DIR.clone(),
            archive_name: BULK_ARCHIVE_NAME.to_string(),
            headless: true,
            timeout: Duration::from_secs(20),
            settle: Duration::from_secs(20),
            max_attempts: 3,
        }
    }
}

impl PortalConfig {
    /// Where the bulk archive is expected to land once a download completes.
    pub fn expected_archive_path(&self) -> PathBuf {
        self.download_dir.join(&self.archive_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Pending,
    Success(PathBuf),
    Failed,
}

/// One bulk-download job: created per `retrieve` invocation, finalized when
/// the archive materializes or the attempt budget runs out.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub source_url: String,
    pub download_dir: PathBuf,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub outcome: JobOutcome,
}

impl ArchiveJob {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            source_url: config.report_url.clone(),
            download_dir: config.download_dir.clone(),
            attempts_made: 0,
            max_attempts: config.max_attempts,
            outcome: JobOutcome::Pending,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success(_))
    }

    /// Path of the retrieved archive, when the job succeeded.
    pub fn archive_path(&self) -> Option<&Path> {
        match &self.outcome {
            JobOutcome::Success(path) => Some(path),
            _ => None,
        }
    }
}
