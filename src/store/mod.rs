//! On-disk table store
//!
//! Caches extracted, merged and packaged mapping tables under a single root.
//! Entries are keyed by a deterministic filename derived from the identity of
//! their inputs, so presence of a file is a valid substitute for recomputing
//! it. A refresh flag overrides presence and forces recomputation.
//!
//! # Layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `mappings/{name}-{version}-{platform}-base.tiny` | table extracted from the artifact |
//! | `mappings/{name}-{version}.tiny` | canonical table (version carries `-v2` for v2 input) |
//! | `mappings/steps/*` | transient reorder/merge working files |
//! | `{artifact}-final[classifier].jar` | packaged canonical table |
//!
//! No locking is done. Runs against the same root must be serialized by the
//! caller.

pub mod entry;

pub use entry::{fingerprint, format_bytes, list_entries, CacheEntry};

use crate::error::{ForgeError, ForgeResult};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the root holding mapping tables
pub const MAPPINGS_CACHE_DIR: &str = "mappings";

/// Directory under the mappings dir holding transient working files
pub const STEPS_CACHE_DIR: &str = "steps";

/// Suffix stripped from mapping artifact names
const UNMERGED_SUFFIX: &str = "-unmerged";

/// Logical identity of a produced table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableIdentity {
    /// `group.name` without the `-unmerged` suffix
    pub name: String,
    /// Resolved version, possibly carrying a format suffix
    pub version: String,
}

impl TableIdentity {
    /// Derive an identity from dependency coordinates
    pub fn new(group: &str, name: &str, version: impl Into<String>) -> Self {
        let full = format!("{}.{}", group, name);
        let name = full
            .strip_suffix(UNMERGED_SUFFIX)
            .map(str::to_string)
            .unwrap_or(full);
        Self {
            name,
            version: version.into(),
        }
    }

    /// `{name}-{version}`
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Whether a cached entry was reused or produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Computed,
}

/// Identity-keyed cache of mapping tables
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mappings_dir(&self) -> PathBuf {
        self.root.join(MAPPINGS_CACHE_DIR)
    }

    pub fn steps_dir(&self) -> PathBuf {
        self.mappings_dir().join(STEPS_CACHE_DIR)
    }

    /// Create the mappings and steps directories
    pub async fn ensure_dirs(&self) -> ForgeResult<()> {
        for dir in [self.mappings_dir(), self.steps_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| ForgeError::io(format!("creating directory {}", dir.display()), e))?;
        }
        Ok(())
    }

    /// Extracted table for an identity on a platform version
    pub fn base_path(&self, identity: &TableIdentity, platform_version: &str) -> PathBuf {
        self.mappings_dir().join(format!(
            "{}-{}-base.tiny",
            identity.file_stem(),
            platform_version
        ))
    }

    /// Canonical table for an identity
    pub fn canonical_path(&self, identity: &TableIdentity) -> PathBuf {
        self.mappings_dir()
            .join(format!("{}.tiny", identity.file_stem()))
    }

    /// Canonical table named by a precomputed stem
    pub fn canonical_path_for_stem(&self, stem: &str) -> PathBuf {
        self.mappings_dir().join(format!("{}.tiny", stem))
    }

    /// Transient working file, e.g. `foo-reordered.tiny`
    pub fn step_path(&self, stem: &str, step: &str) -> PathBuf {
        self.steps_dir().join(format!("{}-{}.tiny", stem, step))
    }

    /// Packaged form of a canonical table: the artifact's name with its
    /// extension replaced by `-final[classifier].jar`
    pub fn packaged_path(&self, artifact: &Path, classifier: Option<&str>) -> PathBuf {
        let stem = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mappings".to_string());
        self.packaged_path_for_stem(&stem, classifier)
    }

    /// Packaged artifact named by a precomputed stem
    pub fn packaged_path_for_stem(&self, stem: &str, classifier: Option<&str>) -> PathBuf {
        self.root.join(format!(
            "{}-final{}.jar",
            stem,
            classifier.unwrap_or_default()
        ))
    }

    /// Run `compute` unless `path` already exists and no refresh is forced
    pub async fn compute_if_absent<F, Fut>(
        &self,
        path: &Path,
        refresh: bool,
        compute: F,
    ) -> ForgeResult<CacheOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ForgeResult<()>>,
    {
        if !refresh && path.exists() {
            debug!("Cache hit: {}", path.display());
            return Ok(CacheOutcome::Hit);
        }

        debug!("Cache miss: {}", path.display());
        compute().await?;

        if !path.exists() {
            return Err(ForgeError::Internal(format!(
                "cache computation did not produce {}",
                path.display()
            )));
        }
        Ok(CacheOutcome::Computed)
    }

    /// Remove the given derived files plus every transient working file
    pub async fn purge(&self, paths: &[&Path]) -> ForgeResult<()> {
        let steps = self.steps_dir();
        if steps.exists() {
            tokio::fs::remove_dir_all(&steps)
                .await
                .map_err(|e| ForgeError::io(format!("purging {}", steps.display()), e))?;
        }
        for path in paths {
            remove_if_exists(path).await?;
        }
        Ok(())
    }

    /// Remove the mappings directory and every packaged artifact under the
    /// root. Returns the number of files removed.
    pub async fn clean(&self) -> ForgeResult<usize> {
        let removed: Vec<CacheEntry> = list_entries(&self.root)?
            .into_iter()
            .filter(|e| e.path.parent() != Some(self.root.as_path()) || is_packaged(&e.path))
            .collect();
        let dir = self.mappings_dir();
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| ForgeError::io(format!("removing {}", dir.display()), e))?;
        }
        for entry in &removed {
            if entry.path.parent() == Some(self.root.as_path()) {
                remove_if_exists(&entry.path).await?;
            }
        }
        Ok(removed.len())
    }
}

/// Whether `path` names a packaged artifact written by the store
fn is_packaged(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".jar") && n.contains("-final"))
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// failed write never leaves a partial file under the final name
pub async fn commit_bytes(path: &Path, bytes: &[u8]) -> ForgeResult<()> {
    let tmp = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ForgeError::io(format!("writing {}", path.display()), e));
    }
    rename_into_place(&tmp, path).await
}

/// Copy `from` to `to` with the same commit discipline as [`commit_bytes`]
pub async fn commit_copy(from: &Path, to: &Path) -> ForgeResult<()> {
    let tmp = temp_sibling(to);
    if let Err(e) = tokio::fs::copy(from, &tmp).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(ForgeError::io(
            format!("copying {} to {}", from.display(), to.display()),
            e,
        ));
    }
    rename_into_place(&tmp, to).await
}

/// Delete a file, ignoring absence
pub async fn remove_if_exists(path: &Path) -> ForgeResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ForgeError::io(format!("deleting {}", path.display()), e)),
    }
}

/// Temp path next to `path`, used for atomic writes
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

async fn rename_into_place(tmp: &Path, path: &Path) -> ForgeResult<()> {
    if let Err(e) = tokio::fs::rename(tmp, path).await {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(ForgeError::io(format!("committing {}", path.display()), e));
    }
    Ok(())
}
