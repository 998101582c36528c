// src/pipeline/extract.rs
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::pipeline::sorted_files;
use crate::utils::error::IngestError;
use crate::utils::logging::RunLog;

/// Extension identifying archive files throughout the pipeline.
pub const ARCHIVE_EXT: &str = "zip";

pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXT))
        .unwrap_or(false)
}

/// Unpacks every entry of `archive` into `dest`, returning the number of
/// files written. Entries whose names would escape `dest` are refused.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, IngestError> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Refusing archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    tracing::debug!("Extracted {} files from {}", written, archive.display());
    Ok(written)
}

/// Extracts every archive found anywhere under `base` into `base`, deleting
/// each one after extraction, and repeats until a full scan finds no archive
/// left. Tolerates arbitrary nesting depth.
///
/// Corrupt archives are logged, left in place and excluded from later scans,
/// which is what makes the loop terminate. Returns the number of files
/// extracted across all passes.
pub fn extract_nested(base: &Path, log: &mut RunLog) -> usize {
    let mut unreadable: HashSet<PathBuf> = HashSet::new();
    let mut total = 0;

    loop {
        let archives: Vec<PathBuf> = sorted_files(base)
            .into_iter()
            .filter(|path| is_archive(path) && !unreadable.contains(path))
            .collect();
        if archives.is_empty() {
            break;
        }

        for archive in archives {
            let name = archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| archive.display().to_string());

            match extract_archive(&archive, base) {
                Ok(count) => {
                    total += count;
                    if let Err(e) = fs::remove_file(&archive) {
                        log.error(format!("Error removing extracted archive {}: {}", name, e));
                        unreadable.insert(archive);
                    } else {
                        log.success(format!("Extracted nested archive: {}", name));
                    }
                }
                Err(e) => {
                    log.error(format!("Skipping unreadable archive {}: {}", name, e));
                    unreadable.insert(archive);
                }
            }
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Builds an in-memory zip from (name, content) pairs.
    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).expect("start entry");
                writer.write_all(data).expect("write entry");
            }
            writer.finish().expect("finish zip");
        }
        cursor.into_inner()
    }

    #[test]
    fn extract_archive_unpacks_all_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("reports.zip");
        std::fs::write(
            &archive,
            zip_bytes(&[("a.csv", b"a,b\n"), ("sub/b.txt", b"text")]),
        )
        .expect("write archive");

        let dest = dir.path().join("out");
        let written = extract_archive(&archive, &dest).expect("extract");

        assert_eq!(written, 2);
        assert!(dest.join("a.csv").is_file());
        assert!(dest.join("sub/b.txt").is_file());
    }

    #[test]
    fn nested_extraction_terminates_at_three_levels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path();

        // archive -> archive -> archive -> file.csv
        let level3 = zip_bytes(&[("file.csv", b"payload")]);
        let level2 = zip_bytes(&[("level3.zip", level3.as_slice())]);
        let level1 = zip_bytes(&[("level2.zip", level2.as_slice())]);
        std::fs::write(base.join("level1.zip"), level1).expect("write archive");

        let mut log = RunLog::new();
        let extracted = extract_nested(base, &mut log);

        assert_eq!(extracted, 3);
        assert!(base.join("file.csv").is_file());
        let leftover_zips = sorted_files(base)
            .into_iter()
            .filter(|p| is_archive(p))
            .count();
        assert_eq!(leftover_zips, 0);
    }

    #[test]
    fn corrupt_archive_is_skipped_and_left_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path();

        std::fs::write(base.join("broken.zip"), b"this is not a zip").expect("write corrupt");
        std::fs::write(base.join("good.zip"), zip_bytes(&[("c.txt", b"c")])).expect("write good");

        let mut log = RunLog::new();
        let extracted = extract_nested(base, &mut log);

        assert_eq!(extracted, 1);
        assert!(base.join("c.txt").is_file());
        assert!(base.join("broken.zip").is_file(), "corrupt archive must stay");
        assert!(!base.join("good.zip").exists());
    }

    #[test]
    fn unsafe_entry_names_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("evil.zip");
        std::fs::write(
            &archive,
            zip_bytes(&[("../escape.txt", b"nope"), ("ok.txt", b"yes")]),
        )
        .expect("write archive");

        let dest = dir.path().join("out");
        let written = extract_archive(&archive, &dest).expect("extract");

        assert_eq!(written, 1);
        assert!(dest.join("ok.txt").is_file());
        assert!(!dir.path().join("escape.txt").exists());
    }
}
