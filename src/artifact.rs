//! Packaged artifact access
//!
//! Mapping tables ship inside jar (zip) artifacts. Reading an embedded entry
//! and packaging a canonical table are collaborator concerns behind the
//! [`ArtifactReader`] and [`Archiver`] traits; [`JarArchive`] is the zip-backed
//! implementation used by the CLI.

use crate::error::{ForgeError, ForgeResult};
use crate::store::{commit_bytes, temp_sibling};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Internal path of the table inside packaged artifacts
pub const MAPPINGS_FILE_PATH: &str = "mappings/mappings.tiny";

/// Fallback location used by older artifacts
pub const LEGACY_MAPPINGS_FILE_PATH: &str = "mappings.tiny";

/// Locations probed, in order, when extracting a table
pub const TABLE_ENTRY_PATHS: [&str; 2] = [MAPPINGS_FILE_PATH, LEGACY_MAPPINGS_FILE_PATH];

/// Installer metadata entries, in lookup order
pub const INSTALLER_ENTRY_PATHS: [&str; 2] = ["quilt_installer.json", "fabric-installer.json"];

/// Reads named entries out of packaged artifacts
pub trait ArtifactReader: Send + Sync {
    /// Return the name and bytes of the first candidate entry present in
    /// `artifact`, or `None` when none of them exist
    fn read_entry(&self, artifact: &Path, candidates: &[&str])
        -> ForgeResult<Option<(String, Vec<u8>)>>;
}

/// Packages a single file into a new artifact
pub trait Archiver: Send + Sync {
    /// Write `source` as `entry_name` into a fresh artifact at `destination`
    fn pack(&self, source: &Path, entry_name: &str, destination: &Path) -> ForgeResult<()>;
}

/// Zip/jar implementation of both collaborator traits
#[derive(Debug, Clone, Copy, Default)]
pub struct JarArchive;

impl ArtifactReader for JarArchive {
    fn read_entry(
        &self,
        artifact: &Path,
        candidates: &[&str],
    ) -> ForgeResult<Option<(String, Vec<u8>)>> {
        let file = File::open(artifact)
            .map_err(|e| ForgeError::io(format!("opening artifact {}", artifact.display()), e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| ForgeError::ArtifactRead {
            path: artifact.to_path_buf(),
            reason: e.to_string(),
        })?;

        for candidate in candidates {
            let mut entry = match archive.by_name(candidate) {
                Ok(entry) => entry,
                Err(ZipError::FileNotFound) => continue,
                Err(e) => {
                    return Err(ForgeError::ArtifactRead {
                        path: artifact.to_path_buf(),
                        reason: format!("{}: {}", candidate, e),
                    })
                }
            };
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes).map_err(|e| {
                ForgeError::io(
                    format!("reading {} from {}", candidate, artifact.display()),
                    e,
                )
            })?;
            return Ok(Some((candidate.to_string(), bytes)));
        }

        Ok(None)
    }
}

impl Archiver for JarArchive {
    fn pack(&self, source: &Path, entry_name: &str, destination: &Path) -> ForgeResult<()> {
        let tmp = temp_sibling(destination);
        let result = write_single_entry_zip(source, entry_name, &tmp);
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(ForgeError::ArtifactWrite {
                path: destination.to_path_buf(),
                reason: e.to_string(),
            });
        }
        std::fs::rename(&tmp, destination).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            ForgeError::io(format!("committing {}", destination.display()), e)
        })
    }
}

fn write_single_entry_zip(source: &Path, entry_name: &str, destination: &Path) -> ForgeResult<()> {
    let mut input = File::open(source)
        .map_err(|e| ForgeError::io(format!("opening {}", source.display()), e))?;
    let output = File::create(destination)
        .map_err(|e| ForgeError::io(format!("creating {}", destination.display()), e))?;

    // Fixed timestamp keeps packaged output byte-identical across runs
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(output);
    writer.start_file(entry_name, options)?;
    io::copy(&mut input, &mut writer)
        .map_err(|e| ForgeError::io(format!("packing {}", source.display()), e))?;
    writer.finish()?;
    Ok(())
}

/// Extract the embedded mapping table of `artifact` into `destination`.
///
/// Fails with `MissingTable` naming `coordinate` when the artifact has no
/// table at any known location; nothing is written in that case.
pub async fn extract_table(
    reader: Arc<dyn ArtifactReader>,
    artifact: &Path,
    coordinate: &str,
    destination: &Path,
) -> ForgeResult<()> {
    debug!(":extracting {}", artifact.display());
    let bytes = read_table_entry(reader, artifact, coordinate).await?;
    commit_bytes(destination, &bytes).await
}

/// Read the embedded mapping table of `artifact` without writing it anywhere
pub async fn read_table_entry(
    reader: Arc<dyn ArtifactReader>,
    artifact: &Path,
    coordinate: &str,
) -> ForgeResult<Vec<u8>> {
    let found = read_entry_blocking(reader, artifact.to_path_buf(), &TABLE_ENTRY_PATHS).await?;
    match found {
        Some((_, bytes)) => Ok(bytes),
        None => Err(ForgeError::MissingTable {
            coordinate: coordinate.to_string(),
            artifact: artifact.to_path_buf(),
            searched: TABLE_ENTRY_PATHS.join(", "),
        }),
    }
}

/// Run [`ArtifactReader::read_entry`] on the blocking pool
pub async fn read_entry_blocking(
    reader: Arc<dyn ArtifactReader>,
    artifact: PathBuf,
    candidates: &'static [&'static str],
) -> ForgeResult<Option<(String, Vec<u8>)>> {
    tokio::task::spawn_blocking(move || reader.read_entry(&artifact, candidates))
        .await
        .map_err(|e| ForgeError::Internal(format!("artifact reader task failed: {}", e)))?
}

/// Run [`Archiver::pack`] on the blocking pool
pub async fn pack_blocking(
    archiver: Arc<dyn Archiver>,
    source: &Path,
    entry_name: &'static str,
    destination: &Path,
) -> ForgeResult<()> {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || archiver.pack(&source, entry_name, &destination))
        .await
        .map_err(|e| ForgeError::Internal(format!("archiver task failed: {}", e)))?
}

/// Build a jar holding the given entries. Used by tests and fixtures.
pub fn write_jar(destination: &Path, entries: &[(&str, &[u8])]) -> ForgeResult<()> {
    let output = File::create(destination)
        .map_err(|e| ForgeError::io(format!("creating {}", destination.display()), e))?;
    let mut writer = ZipWriter::new(output);
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
    for (name, bytes) in entries {
        writer.start_file(*name, options)?;
        io::Write::write_all(&mut writer, bytes)
            .map_err(|e| ForgeError::io(format!("writing {} into jar", name), e))?;
    }
    writer.finish()?;
    Ok(())
}
