// src/pipeline/dedupe.rs
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::pipeline::sorted_files;
use crate::utils::logging::RunLog;

const HASH_BUF_SIZE: usize = 64 * 1024;

/// SHA-256 over the file's full byte content, hex-encoded. Names play no
/// part in the fingerprint.
pub fn fingerprint(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUF_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DedupeStats {
    pub kept: usize,
    pub removed: usize,
}

/// Deletes every file whose fingerprint was already seen earlier in the
/// walk; the first file seen (name-sorted order) is the one kept.
/// Unreadable files are logged and left alone.
pub fn dedupe_tree(base: &Path, log: &mut RunLog) -> DedupeStats {
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut stats = DedupeStats::default();

    for path in sorted_files(base) {
        let digest = match fingerprint(&path) {
            Ok(digest) => digest,
            Err(e) => {
                log.error(format!("Error fingerprinting {}: {}", path.display(), e));
                continue;
            }
        };

        if let Some(original) = seen.get(&digest) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    stats.removed += 1;
                    log.success(format!(
                        "Duplicate removed: {} (same content as {})",
                        path.display(),
                        original.display()
                    ));
                }
                Err(e) => {
                    log.error(format!(
                        "Error removing duplicate {}: {}",
                        path.display(),
                        e
                    ));
                }
            }
        } else {
            seen.insert(digest, path);
            stats.kept += 1;
        }
    }

    stats
}
