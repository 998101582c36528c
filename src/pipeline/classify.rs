// src/pipeline/classify.rs
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::pipeline::dedupe::fingerprint;
use crate::pipeline::sorted_files;
use crate::utils::logging::RunLog;

/// Bucket for files with no extension.
pub const FALLBACK_BUCKET: &str = "OTHER";

/// Lower-cased extension (text after the last '.'), if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Directory name the file belongs under: upper-cased extension, or the
/// fallback bucket when there is none.
pub fn bucket_name(path: &Path) -> String {
    extension_of(path)
        .map(|ext| ext.to_uppercase())
        .unwrap_or_else(|| FALLBACK_BUCKET.to_string())
}

/// Extension → bucket-directory map for one run. Each directory is created
/// directly under the run folder on the first file of its extension.
pub struct ExtensionBuckets {
    base: PathBuf,
    dirs: HashMap<String, PathBuf>,
}

impl ExtensionBuckets {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
            dirs: HashMap::new(),
        }
    }

    /// Bucket directory for `bucket`, created on first use.
    pub fn dir_for(&mut self, bucket: &str) -> io::Result<&Path> {
        if !self.dirs.contains_key(bucket) {
            let dir = self.base.join(bucket);
            fs::create_dir_all(&dir)?;
            self.dirs.insert(bucket.to_string(), dir);
        }
        Ok(self.dirs[bucket].as_path())
    }
}

/// Moves `path` into its extension bucket under the run folder.
///
/// An occupied destination is never clobbered: identical content is removed
/// as a duplicate, differing content is left in place with a logged error.
pub fn classify_file(
    path: &Path,
    buckets: &mut ExtensionBuckets,
    log: &mut RunLog,
) -> io::Result<()> {
    let file_name = match path.file_name() {
        Some(name) => name.to_os_string(),
        None => return Ok(()),
    };
    let bucket = bucket_name(path);
    let target = buckets.dir_for(&bucket)?.join(&file_name);

    if target.as_path() == path {
        // Already in its bucket.
        return Ok(());
    }

    if target.exists() {
        if fingerprint(path)? == fingerprint(&target)? {
            fs::remove_file(path)?;
            log.success(format!(
                "Duplicate removed at classification: {}",
                path.display()
            ));
        } else {
            log.error(format!(
                "Error moving {}: {} already occupied by different content",
                path.display(),
                target.display()
            ));
        }
        return Ok(());
    }

    fs::rename(path, &target)?;
    log.success(format!(
        "Moved: {} -> {}",
        file_name.to_string_lossy(),
        target.display()
    ));
    Ok(())
}

/// Classifies every file under `base`, returning how many were processed.
/// Per-file failures are logged and never stop the walk.
pub fn classify_tree(base: &Path, log: &mut RunLog) -> usize {
    let mut buckets = ExtensionBuckets::new(base);
    let mut classified = 0;

    for path in sorted_files(base) {
        match classify_file(&path, &mut buckets, log) {
            Ok(()) => classified += 1,
            Err(e) => log.error(format!("Error classifying {}: {}", path.display(), e)),
        }
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_land_one_level_below_base_in_uppercase_buckets() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
        std::fs::write(dir.path().join("a.csv"), b"a").expect("write");
        std::fs::write(dir.path().join("nested/b.TXT"), b"b").expect("write");
        std::fs::write(dir.path().join("README"), b"no extension").expect("write");

        let mut log = RunLog::new();
        let classified = classify_tree(dir.path(), &mut log);

        assert_eq!(classified, 3);
        assert!(dir.path().join("CSV/a.csv").is_file());
        assert!(dir.path().join("TXT/b.TXT").is_file());
        assert!(dir.path().join("OTHER/README").is_file());
    }

    #[test]
    fn bucket_directories_are_created_once_and_reused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buckets = ExtensionBuckets::new(dir.path());

        let first = buckets.dir_for("CSV").expect("create").to_path_buf();
        let second = buckets.dir_for("CSV").expect("reuse").to_path_buf();

        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn occupied_destination_with_same_content_is_removed_as_duplicate() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("CSV")).expect("mkdir");
        std::fs::write(dir.path().join("CSV/report.csv"), b"same").expect("write");
        std::fs::create_dir(dir.path().join("incoming")).expect("mkdir");
        std::fs::write(dir.path().join("incoming/report.csv"), b"same").expect("write");

        let mut log = RunLog::new();
        classify_tree(dir.path(), &mut log);

        assert!(dir.path().join("CSV/report.csv").is_file());
        assert!(!dir.path().join("incoming/report.csv").exists());
    }

    #[test]
    fn occupied_destination_with_different_content_is_never_clobbered() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("CSV")).expect("mkdir");
        std::fs::write(dir.path().join("CSV/report.csv"), b"original").expect("write");
        std::fs::create_dir(dir.path().join("incoming")).expect("mkdir");
        std::fs::write(dir.path().join("incoming/report.csv"), b"conflicting").expect("write");

        let mut log = RunLog::new();
        classify_tree(dir.path(), &mut log);

        let kept = std::fs::read_to_string(dir.path().join("CSV/report.csv")).expect("read");
        assert_eq!(kept, "original");
        assert!(
            dir.path().join("incoming/report.csv").exists(),
            "conflicting file must survive"
        );
    }
}
