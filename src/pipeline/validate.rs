// src/pipeline/validate.rs
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::pipeline::classify::bucket_name;
use crate::pipeline::sorted_files;
use crate::utils::logging::RunLog;

/// Audit record for a single file after classification.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub path: PathBuf,
    pub expected_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub ok: bool,
}

/// Re-walks the run folder and confirms every file sits in the bucket its
/// extension maps to. Pure audit: one logged line and one result per file,
/// nothing is mutated.
pub fn validate_tree(base: &Path, log: &mut RunLog) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    for path in sorted_files(base) {
        let expected_dir = base.join(bucket_name(&path));
        let actual_dir = path.parent().unwrap_or(base).to_path_buf();
        let ok = actual_dir == expected_dir;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if ok {
            log.success(format!(
                "File {} correctly moved to {}",
                name,
                expected_dir.display()
            ));
        } else {
            log.error(format!(
                "File {} not moved to {}",
                name,
                expected_dir.display()
            ));
        }

        results.push(ValidationResult {
            path,
            expected_dir,
            actual_dir,
            ok,
        });
    }

    results
}
