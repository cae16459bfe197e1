//! Cache entry listing and fingerprints

use crate::error::{ForgeError, ForgeResult};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file held by the table store
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    /// SHA256 of the contents (first 12 hex chars)
    pub fingerprint: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Hash a file's contents using SHA256, returning first 12 hex chars
pub fn fingerprint(path: &Path) -> ForgeResult<String> {
    let contents = fs::read(path).map_err(|e| ForgeError::Io {
        context: format!("reading cache entry {}", path.display()),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    let result = hasher.finalize();

    Ok(hex::encode(&result[..6]))
}

/// List the files in the store root, `mappings/` and `mappings/steps/`,
/// sorted by path
pub fn list_entries(root: &Path) -> ForgeResult<Vec<CacheEntry>> {
    let mappings = root.join(super::MAPPINGS_CACHE_DIR);
    let steps = mappings.join(super::STEPS_CACHE_DIR);
    let mut entries = Vec::new();

    for dir in [root.to_path_buf(), mappings, steps] {
        let read = match fs::read_dir(&dir) {
            Ok(read) => read,
            Err(_) => continue, // Directory doesn't exist yet
        };
        for item in read {
            let item = item.map_err(|e| ForgeError::io(format!("listing {}", dir.display()), e))?;
            let path = item.path();
            if !path.is_file() {
                continue;
            }
            let metadata = item
                .metadata()
                .map_err(|e| ForgeError::io(format!("inspecting {}", path.display()), e))?;
            entries.push(CacheEntry {
                fingerprint: fingerprint(&path)?,
                path,
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Found {} cache entries under {}", entries.len(), root.display());
    Ok(entries)
}
