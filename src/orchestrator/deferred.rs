//! Deferred actions
//!
//! Work scheduled by providers during a run and executed, in append order,
//! after every slot has been processed. Actions are plain data so a run's
//! schedule can be inspected and compared.

use crate::artifact::{read_entry_blocking, INSTALLER_ENTRY_PATHS};
use crate::context::{BuildContext, InstallerData};
use crate::error::{ForgeError, ForgeResult};
use crate::provider::RunOutputs;
use crate::resolver::DependencyResolver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// An action run after all slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeferredAction {
    /// Scan a slot's artifacts for installer metadata
    DiscoverInstaller { slot: String },
    /// Remove transient working files
    PruneSteps { dir: PathBuf },
}

impl DeferredAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiscoverInstaller { .. } => "discover_installer",
            Self::PruneSteps { .. } => "prune_steps",
        }
    }

    /// Execute the action. Errors are wrapped with the action's name.
    pub async fn execute(
        &self,
        build: &BuildContext,
        resolver: &dyn DependencyResolver,
        outputs: &RunOutputs,
    ) -> ForgeResult<()> {
        let result = match self {
            Self::DiscoverInstaller { slot } => {
                discover_installer(build, resolver, outputs, slot).await
            }
            Self::PruneSteps { dir } => prune_steps(dir).await,
        };
        result.map_err(|e| ForgeError::Deferred {
            action: self.name().to_string(),
            source: Box::new(e),
        })
    }
}

/// Actions in the order they were scheduled
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    actions: Vec<DeferredAction>,
}

impl DeferredQueue {
    pub fn push(&mut self, action: DeferredAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeferredAction> {
        self.actions.iter()
    }
}

async fn discover_installer(
    build: &BuildContext,
    resolver: &dyn DependencyResolver,
    outputs: &RunOutputs,
    slot: &str,
) -> ForgeResult<()> {
    if build.installer().is_some() {
        debug!("Installer metadata already known, skipping '{}'", slot);
        return Ok(());
    }

    let mut dependencies = resolver.dependencies(slot);
    dependencies.extend(outputs.emitted(slot).iter().cloned());

    let reader = build.collaborators().reader.clone();
    for dependency in dependencies {
        let found =
            read_entry_blocking(reader.clone(), dependency.artifact.clone(), &INSTALLER_ENTRY_PATHS)
                .await?;
        let Some((entry, bytes)) = found else {
            continue;
        };

        if build.installer().is_some() {
            info!(
                "Found another installer JSON ({}) in {}, ignoring it",
                entry, dependency
            );
            continue;
        }

        let data = InstallerData::parse(&dependency.version, dependency.artifact.clone(), &bytes)?;
        if build.set_installer(data).is_ok() {
            info!("Found installer JSON ({}) in {}", entry, dependency);
        }
    }

    if build.installer().is_none() {
        warn!("Did not find an installer JSON in '{}'", slot);
    }
    Ok(())
}

async fn prune_steps(dir: &std::path::Path) -> ForgeResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!("Pruned {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ForgeError::io(format!("pruning {}", dir.display()), e)),
    }
}
