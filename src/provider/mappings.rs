//! Mappings provider
//!
//! Turns the project's single `mappings` dependency into a canonical table.
//! Tiny v2 tables are joined with the canonical intermediate table; legacy
//! v1 tables are already merged and are promoted as they are.

use super::{slots, CanonicalTable, DependencyProvider, ProvideContext, ProviderRole, SlotBinding};
use crate::artifact::{pack_blocking, read_table_entry, MAPPINGS_FILE_PATH};
use crate::context::BuildContext;
use crate::error::{ForgeError, ForgeResult};
use crate::resolver::ResolvedDependency;
use crate::store::{commit_bytes, commit_copy, remove_if_exists, TableIdentity};
use crate::table::{TableFormat, TableHeader};
use crate::transform::{lead_with, reorder_file};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Table read out of the dependency's artifact
struct Extracted {
    header: TableHeader,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MappingsProvider {
    format: Option<TableFormat>,
    canonical: Option<CanonicalTable>,
}

impl MappingsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format of the provided table, once provided
    pub fn format(&self) -> Option<TableFormat> {
        self.format
    }

    /// The canonical table, once provided
    pub fn canonical(&self) -> Option<&CanonicalTable> {
        self.canonical.as_ref()
    }

    /// Whether the provided table needed merging
    pub fn is_v2(&self) -> bool {
        self.format == Some(TableFormat::V2)
    }
}

/// Identity of a mapping table in a given format
fn identity_for(dependency: &ResolvedDependency, format: TableFormat) -> TableIdentity {
    TableIdentity::new(
        &dependency.group,
        &dependency.name,
        format!("{}{}", dependency.version, format.version_suffix()),
    )
}

/// Format of an already cached canonical table for `dependency`, so a warm
/// cache never has to open the artifact
fn cached_format(build: &BuildContext, dependency: &ResolvedDependency) -> Option<TableFormat> {
    if build.refresh() {
        return None;
    }
    [TableFormat::V2, TableFormat::V1]
        .into_iter()
        .find(|format| {
            build
                .store()
                .canonical_path(&identity_for(dependency, *format))
                .exists()
        })
}

async fn extract(build: &BuildContext, dependency: &ResolvedDependency) -> ForgeResult<Extracted> {
    let bytes = read_table_entry(
        build.collaborators().reader.clone(),
        &dependency.artifact,
        &dependency.coordinate(),
    )
    .await?;
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let header = TableHeader::parse(&dependency.artifact, &String::from_utf8_lossy(first_line))?;
    Ok(Extracted { header, bytes })
}

#[async_trait]
impl DependencyProvider for MappingsProvider {
    fn kind(&self) -> &'static str {
        "mappings"
    }

    fn role(&self) -> ProviderRole {
        ProviderRole::Mappings
    }

    fn bind_slot(&self) -> SlotBinding {
        SlotBinding::single(slots::MAPPINGS)
    }

    fn reset(&mut self) {
        self.format = None;
        self.canonical = None;
    }

    async fn provide(
        &mut self,
        dependency: &ResolvedDependency,
        ctx: &mut ProvideContext<'_>,
    ) -> ForgeResult<()> {
        info!(
            ":setting up mappings ({} {})",
            dependency.name, dependency.version
        );

        let build = ctx.build;
        let store = build.store();

        let (format, extracted) = match cached_format(build, dependency) {
            Some(format) => {
                debug!("Mappings for {} already cached as {:?}", dependency, format);
                (format, None)
            }
            None => {
                let extracted = extract(build, dependency).await?;
                (extracted.header.format, Some(extracted))
            }
        };

        let identity = identity_for(dependency, format);
        let base = store.base_path(&identity, build.platform_version());
        let canonical = store.canonical_path(&identity);
        let packaged = store.packaged_path(&dependency.artifact, dependency.classifier.as_deref());

        if build.refresh() {
            store
                .purge(&[base.as_path(), canonical.as_path(), packaged.as_path()])
                .await?;
        }
        store.ensure_dirs().await?;

        let partner = ctx.outputs().intermediate().cloned();
        let coordinate = dependency.coordinate();
        store
            .compute_if_absent(&canonical, build.refresh(), || async {
                let extracted = extracted.ok_or_else(|| {
                    ForgeError::Internal(format!("{} was not extracted", coordinate))
                })?;
                commit_bytes(&base, &extracted.bytes).await?;

                match extracted.header.format {
                    TableFormat::V2 => {
                        let partner = partner.ok_or_else(|| {
                            ForgeError::Configuration(
                                "intermediate mappings must be finalized before mappings"
                                    .to_string(),
                            )
                        })?;
                        merge_with_partner(
                            build,
                            &partner,
                            &base,
                            &extracted.header,
                            &canonical,
                            &identity.file_stem(),
                            &coordinate,
                        )
                        .await
                    }
                    TableFormat::V1 => promote(&base, &canonical).await,
                }
            })
            .await?;

        let archiver = build.collaborators().archiver.clone();
        store
            .compute_if_absent(&packaged, build.refresh(), || {
                pack_blocking(archiver, &canonical, MAPPINGS_FILE_PATH, &packaged)
            })
            .await?;

        let namespaces = TableHeader::read(&canonical).await?.namespaces;
        ctx.emit(
            slots::MAPPINGS_FINAL,
            ResolvedDependency::local(&identity.name, &identity.version, &packaged),
        );

        let table = CanonicalTable {
            identity,
            role: ProviderRole::Mappings,
            slot: slots::MAPPINGS.to_string(),
            table: canonical,
            artifact: packaged,
            namespaces,
        };
        ctx.publish(table.clone());
        self.format = Some(format);
        self.canonical = Some(table);
        Ok(())
    }
}

/// Join the base table with the intermediate canonical table on the join
/// namespace, then lead the result with the source namespace
async fn merge_with_partner(
    build: &BuildContext,
    partner: &CanonicalTable,
    base: &Path,
    base_header: &TableHeader,
    canonical: &Path,
    stem: &str,
    coordinate: &str,
) -> ForgeResult<()> {
    let join = build.namespaces().join.as_str();
    let source = build.namespaces().source.as_str();

    if !base_header.namespaces.iter().any(|ns| ns == join) {
        return Err(ForgeError::MissingNamespace {
            slot: slots::MAPPINGS.to_string(),
            namespace: join.to_string(),
            coordinate: coordinate.to_string(),
        });
    }
    if !partner.namespaces.iter().any(|ns| ns == join) {
        return Err(ForgeError::MissingNamespace {
            slot: partner.slot.clone(),
            namespace: join.to_string(),
            coordinate: partner.identity.to_string(),
        });
    }

    let store = build.store();
    let partner_input = lead_with_join(
        &partner.table,
        &partner.namespaces,
        join,
        store.step_path(stem, "merge-partner"),
    )
    .await?;
    let base_input = lead_with_join(
        base,
        &base_header.namespaces,
        join,
        store.step_path(stem, "reordered"),
    )
    .await?;

    let merged = store.step_path(stem, "merged");
    build
        .collaborators()
        .merger
        .merge(&[partner_input, base_input], &merged)
        .await?;

    let merged_namespaces = TableHeader::read(&merged).await?.namespaces;
    if merged_namespaces[0] == source || !merged_namespaces.iter().any(|ns| ns == source) {
        commit_copy(&merged, canonical).await
    } else {
        reorder_file(&merged, canonical, &lead_with(&merged_namespaces, source)).await
    }
}

/// `input` itself when it already leads with `join`, otherwise a reordered
/// copy at `step`
async fn lead_with_join(
    input: &Path,
    namespaces: &[String],
    join: &str,
    step: PathBuf,
) -> ForgeResult<PathBuf> {
    if namespaces.first().map(String::as_str) == Some(join) {
        return Ok(input.to_path_buf());
    }
    reorder_file(input, &step, &lead_with(namespaces, join)).await?;
    Ok(step)
}

/// Make the extracted base table the canonical table
async fn promote(base: &Path, canonical: &Path) -> ForgeResult<()> {
    debug!("Promoting {} as canonical", base.display());
    remove_if_exists(canonical).await?;
    tokio::fs::rename(base, canonical)
        .await
        .map_err(|e| ForgeError::io(format!("promoting {}", base.display()), e))
}
