// src/pipeline/ingest.rs
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::pipeline::classify::classify_tree;
use crate::pipeline::dedupe::dedupe_tree;
use crate::pipeline::extract::{extract_archive, extract_nested};
use crate::pipeline::validate::{validate_tree, ValidationResult};
use crate::utils::error::IngestError;
use crate::utils::logging::RunLog;

/// Per-stage counts from one ingest run, consumed by the summary writer and
/// the notification layer.
#[derive(Debug)]
pub struct IngestReport {
    pub base_dir: PathBuf,
    pub files_extracted: usize,
    pub nested_extracted: usize,
    pub duplicates_removed: usize,
    pub files_classified: usize,
    pub validation: Vec<ValidationResult>,
}

impl IngestReport {
    pub fn validation_passed(&self) -> usize {
        self.validation.iter().filter(|r| r.ok).count()
    }

    pub fn validation_failed(&self) -> usize {
        self.validation.len() - self.validation_passed()
    }

    pub fn all_valid(&self) -> bool {
        self.validation_failed() == 0
    }
}

/// Runs the extract → dedupe → classify → validate chain over one downloaded
/// archive. Stages run strictly in order; each depends on the complete
/// output of the one before it.
///
/// `Err` means the archive itself could not be ingested (missing, unreadable
/// or undeletable). Every later stage degrades per file instead of failing
/// the run.
pub fn ingest(
    archive_path: &Path,
    base_dir: &Path,
    log: &mut RunLog,
) -> Result<IngestReport, IngestError> {
    if !archive_path.exists() {
        log.error(format!(
            "{} not found, nothing to ingest",
            archive_path.display()
        ));
        return Err(IngestError::MissingArchive(archive_path.to_path_buf()));
    }
    fs::create_dir_all(base_dir)?;

    let archive_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Stage 1: the downloaded archive must extract; its source is deleted
    // once its contents are safely on disk.
    let files_extracted = extract_archive(archive_path, base_dir)?;
    fs::remove_file(archive_path)?;
    log.success(format!(
        "Extracted {} to {}",
        archive_name,
        base_dir.display()
    ));

    // Stage 2: flatten nested archives until a full scan finds none.
    let nested_extracted = extract_nested(base_dir, log);

    // Stage 3: drop content-identical files before anything gets moved.
    let dedupe_stats = dedupe_tree(base_dir, log);
    tracing::debug!(
        "Dedupe kept {} unique files, removed {}",
        dedupe_stats.kept,
        dedupe_stats.removed
    );

    // Stage 4: segregate the survivors by extension.
    let files_classified = classify_tree(base_dir, log);
    sweep_empty_dirs(base_dir);

    // Stage 5: audit the final layout.
    let validation = validate_tree(base_dir, log);

    let report = IngestReport {
        base_dir: base_dir.to_path_buf(),
        files_extracted,
        nested_extracted,
        duplicates_removed: dedupe_stats.removed,
        files_classified,
        validation,
    };

    log.success(format!(
        "Ingest complete: {} files classified, {} duplicates removed, validation {}/{} passed",
        report.files_classified,
        report.duplicates_removed,
        report.validation_passed(),
        report.validation.len()
    ));

    Ok(report)
}

/// Drops directories left empty after classification (extraction
/// intermediates). Bucket directories are created on first file, so a
/// non-empty directory is never touched.
fn sweep_empty_dirs(base: &Path) {
    let dirs: Vec<PathBuf> = WalkDir::new(base)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    for dir in dirs {
        // remove_dir refuses non-empty directories, which is the behavior we rely on
        let _ = fs::remove_dir(&dir);
    }
}
