// src/pipeline/mod.rs
pub mod classify;
pub mod dedupe;
pub mod extract;
pub mod ingest;
pub mod validate;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::storage::RUN_SUMMARY_FILE;
use crate::utils::logging::RUN_LOG_FILE;

// Re-export the orchestrator entry point for convenience
#[allow(unused_imports)]
pub use ingest::{ingest, IngestReport};

/// Files the run writes for itself and must not extract, dedupe or move.
fn is_run_artifact(base: &Path, path: &Path) -> bool {
    path == base.join(RUN_LOG_FILE) || path == base.join(RUN_SUMMARY_FILE)
}

/// All regular files under `base` in name-sorted order, excluding the run's
/// own log and summary. Sorting keeps walk order (and therefore dedup
/// tie-breaks) deterministic across platforms.
pub fn sorted_files(base: &Path) -> Vec<PathBuf> {
    WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", base.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| !is_run_artifact(base, path))
        .collect()
}
