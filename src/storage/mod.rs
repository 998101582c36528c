// src/storage/mod.rs
#![allow(dead_code)]
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::pipeline::ingest::IngestReport;
use crate::portal::models::ArchiveJob;
use crate::utils::error::StorageError;
use crate::utils::logging::RunLog;

/// Folder under the download root holding one dated subfolder per run.
pub const REPORTS_DIR: &str = "NSE Reports";

/// Machine-readable run summary written next to the run log.
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

const RUN_DIR_FORMAT: &str = "%Y-%m-%d";

/// Owns the on-disk layout under `<download-root>/NSE Reports/`.
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    /// Creates a store rooted at the download folder, creating the reports
    /// directory if it doesn't exist.
    pub fn new<P: AsRef<Path>>(download_root: P) -> Result<Self, StorageError> {
        let root = download_root.as_ref().join(REPORTS_DIR);

        if !root.exists() {
            fs::create_dir_all(&root).map_err(StorageError::IoError)?;
        }

        Ok(Self { root })
    }

    pub fn run_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format(RUN_DIR_FORMAT).to_string())
    }

    /// Creates (idempotently) the dated folder one ingest run works in.
    pub fn create_run_dir(&self, date: NaiveDate) -> Result<PathBuf, StorageError> {
        let dir = self.run_dir(date);
        fs::create_dir_all(&dir).map_err(StorageError::IoError)?;
        Ok(dir)
    }

    /// Newest dated run folder, if any exist. Non-date directories under the
    /// reports root are ignored.
    pub fn latest_run_dir(&self) -> Option<(PathBuf, NaiveDate)> {
        let entries = fs::read_dir(&self.root).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                NaiveDate::parse_from_str(&name, RUN_DIR_FORMAT)
                    .ok()
                    .map(|date| (entry.path(), date))
            })
            .max_by_key(|(_, date)| *date)
    }

    /// File counts keyed by bucket directory, for the dashboard summary.
    pub fn extension_summary(run_dir: &Path) -> io::Result<BTreeMap<String, usize>> {
        let mut summary = BTreeMap::new();

        for entry in fs::read_dir(run_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let bucket = entry.file_name().to_string_lossy().into_owned();
            let count = fs::read_dir(entry.path())?
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count();
            summary.insert(bucket, count);
        }

        Ok(summary)
    }

    /// Writes the run summary the notification layer composes its message
    /// from: outcome, counts, last log lines and the output path.
    pub fn save_run_summary(
        &self,
        run_dir: &Path,
        job: &ArchiveJob,
        report: &IngestReport,
        log: &RunLog,
    ) -> Result<PathBuf, StorageError> {
        let extension_counts = Self::extension_summary(run_dir).map_err(StorageError::IoError)?;
        let failures: Vec<_> = report.validation.iter().filter(|r| !r.ok).collect();

        let summary = serde_json::json!({
            "source_url": job.source_url,
            "attempts_made": job.attempts_made,
            "output_dir": report.base_dir,
            "files_extracted": report.files_extracted,
            "nested_extracted": report.nested_extracted,
            "duplicates_removed": report.duplicates_removed,
            "files_classified": report.files_classified,
            "validation_passed": report.validation_passed(),
            "validation_failures": failures,
            "files_by_extension": extension_counts,
            "last_log_lines": log.tail(10),
            "completed_at": chrono::Local::now().to_rfc3339(),
        });

        let file_path = run_dir.join(RUN_SUMMARY_FILE);
        let summary_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, summary_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved run summary to {}", file_path.display());

        Ok(file_path)
    }
}
