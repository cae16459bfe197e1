//! Intermediate mappings provider
//!
//! Collects every `intermediateMappings` dependency, then on finalize turns
//! them into one canonical table whose first namespace is the source
//! namespace. A single dependency is copied as is; several are reordered to
//! lead with the source namespace and merged in declaration order.

use super::{
    slots, CanonicalTable, DependencyProvider, ProvideContext, ProviderRole, SlotBinding,
};
use crate::artifact::{extract_table, pack_blocking, MAPPINGS_FILE_PATH};
use crate::context::BuildContext;
use crate::error::{ForgeError, ForgeResult};
use crate::orchestrator::DeferredAction;
use crate::resolver::ResolvedDependency;
use crate::store::{commit_copy, TableIdentity};
use crate::table::{TableFormat, TableHeader};
use crate::transform::{lead_with, reorder_file};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A recorded intermediate dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingsDependency {
    pub artifact: PathBuf,
    /// Where the extracted table is cached
    pub base_table: PathBuf,
    pub group: String,
    pub name: String,
    pub version: String,
    pub coordinate: String,
}

impl MappingsDependency {
    /// `{name}-{version}`
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Default)]
pub struct IntermediateMappingsProvider {
    dependencies: Vec<MappingsDependency>,
    canonical: Option<CanonicalTable>,
}

impl IntermediateMappingsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies recorded so far, in declaration order
    pub fn dependencies(&self) -> &[MappingsDependency] {
        &self.dependencies
    }

    /// The canonical table, once finalized
    pub fn canonical(&self) -> Option<&CanonicalTable> {
        self.canonical.as_ref()
    }

    /// Namespaces of the canonical table; empty before finalize
    pub fn namespaces(&self) -> &[String] {
        self.canonical
            .as_ref()
            .map(|c| c.namespaces.as_slice())
            .unwrap_or_default()
    }

    /// Canonical namespaces minus `excluded`, order kept
    pub fn namespaces_except(&self, excluded: &[&str]) -> Vec<String> {
        self.namespaces()
            .iter()
            .filter(|ns| !excluded.contains(&ns.as_str()))
            .cloned()
            .collect()
    }

    /// Stem of the canonical file: every dependency's `{name}-{version}`
    /// joined with `_`
    fn canonical_stem(&self) -> String {
        self.dependencies
            .iter()
            .map(MappingsDependency::file_stem)
            .collect::<Vec<_>>()
            .join("_")
    }
}

#[async_trait]
impl DependencyProvider for IntermediateMappingsProvider {
    fn kind(&self) -> &'static str {
        "intermediate-mappings"
    }

    fn role(&self) -> ProviderRole {
        ProviderRole::IntermediateMappings
    }

    fn bind_slot(&self) -> SlotBinding {
        SlotBinding::multiple(slots::INTERMEDIATE_MAPPINGS)
    }

    fn reset(&mut self) {
        self.dependencies.clear();
        self.canonical = None;
    }

    async fn provide(
        &mut self,
        dependency: &ResolvedDependency,
        ctx: &mut ProvideContext<'_>,
    ) -> ForgeResult<()> {
        info!(
            ":setting up intermediate mappings ({} {})",
            dependency.name, dependency.version
        );

        let identity = TableIdentity::new(
            &dependency.group,
            &dependency.name,
            dependency.version.clone(),
        );
        let base_table = ctx
            .build
            .store()
            .base_path(&identity, ctx.build.platform_version());

        self.dependencies.push(MappingsDependency {
            artifact: dependency.artifact.clone(),
            base_table,
            group: dependency.group.clone(),
            name: dependency.name.clone(),
            version: dependency.version.clone(),
            coordinate: dependency.coordinate(),
        });
        Ok(())
    }

    async fn finalize(&mut self, ctx: &mut ProvideContext<'_>) -> ForgeResult<()> {
        if self.dependencies.is_empty() {
            return Err(ForgeError::MissingDependency {
                slot: slots::INTERMEDIATE_MAPPINGS.to_string(),
            });
        }

        let build = ctx.build;
        let store = build.store();
        let stem = self.canonical_stem();
        let canonical = store.canonical_path_for_stem(&stem);
        let packaged = store.packaged_path_for_stem(&stem, None);

        if build.refresh() {
            let mut stale = vec![canonical.as_path(), packaged.as_path()];
            stale.extend(self.dependencies.iter().map(|d| d.base_table.as_path()));
            store.purge(&stale).await?;
        }
        store.ensure_dirs().await?;

        let dependencies = &self.dependencies;
        store
            .compute_if_absent(&canonical, build.refresh(), || {
                build_canonical(build, dependencies, &canonical)
            })
            .await?;

        let archiver = build.collaborators().archiver.clone();
        store
            .compute_if_absent(&packaged, build.refresh(), || {
                pack_blocking(archiver, &canonical, MAPPINGS_FILE_PATH, &packaged)
            })
            .await?;

        let namespaces = TableHeader::read(&canonical).await?.namespaces;
        debug!("Intermediate namespaces: {:?}", namespaces);

        let identity = TableIdentity {
            name: stem.clone(),
            version: build.platform_version().to_string(),
        };
        ctx.emit(
            slots::MAPPINGS_FINAL,
            ResolvedDependency::local(&stem, build.platform_version(), &packaged),
        );

        let table = CanonicalTable {
            identity,
            role: ProviderRole::IntermediateMappings,
            slot: slots::INTERMEDIATE_MAPPINGS.to_string(),
            table: canonical,
            artifact: packaged,
            namespaces,
        };
        ctx.publish(table.clone());
        ctx.schedule(DeferredAction::PruneSteps {
            dir: store.steps_dir(),
        });
        self.canonical = Some(table);
        Ok(())
    }
}

/// Extract, check and combine every dependency into `canonical`
async fn build_canonical(
    build: &BuildContext,
    dependencies: &[MappingsDependency],
    canonical: &Path,
) -> ForgeResult<()> {
    let reader = build.collaborators().reader.clone();
    let extractions = dependencies.iter().map(|dep| {
        let reader = reader.clone();
        async move {
            if dep.base_table.exists() {
                debug!("Reusing extracted table {}", dep.base_table.display());
                return Ok(());
            }
            extract_table(reader, &dep.artifact, &dep.coordinate, &dep.base_table).await
        }
    });
    // Every extraction settles before the first failure is reported
    for result in join_all(extractions).await {
        result?;
    }

    let source = build.namespaces().source.as_str();
    let mut headers = Vec::with_capacity(dependencies.len());
    for dep in dependencies {
        let header = TableHeader::read(&dep.base_table).await?;
        if header.format == TableFormat::V1 {
            return Err(ForgeError::UnsupportedFormat {
                coordinate: dep.coordinate.clone(),
            });
        }
        if !header.namespaces.iter().any(|ns| ns == source) {
            return Err(ForgeError::MissingNamespace {
                slot: slots::INTERMEDIATE_MAPPINGS.to_string(),
                namespace: source.to_string(),
                coordinate: dep.coordinate.clone(),
            });
        }
        headers.push(header);
    }

    if let [only] = dependencies {
        debug!("Single intermediate table, copying {}", only.base_table.display());
        return commit_copy(&only.base_table, canonical).await;
    }

    let store = build.store();
    let mut inputs = Vec::with_capacity(dependencies.len());
    for (dep, header) in dependencies.iter().zip(&headers) {
        if header.namespaces[0] == source {
            inputs.push(dep.base_table.clone());
            continue;
        }
        let reordered = store.step_path(&dep.file_stem(), "reordered");
        reorder_file(
            &dep.base_table,
            &reordered,
            &lead_with(&header.namespaces, source),
        )
        .await?;
        inputs.push(reordered);
    }

    build.collaborators().merger.merge(&inputs, canonical).await
}
