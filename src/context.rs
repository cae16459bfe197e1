//! Build context threaded through every provider call
//!
//! Everything here is fixed before the run starts, except for values that
//! are discovered once during the run and read afterwards. Those live in
//! single-assignment cells: the first value set wins.

use crate::artifact::{Archiver, ArtifactReader, JarArchive};
use crate::config::{Config, ConfigManager};
use crate::error::{ForgeError, ForgeResult};
use crate::store::TableStore;
use crate::transform::{JoinMerger, TableMerger};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Default namespace every intermediate table must carry
pub const DEFAULT_SOURCE_NAMESPACE: &str = "official";

/// Default namespace mapping tables are joined on
pub const DEFAULT_JOIN_NAMESPACE: &str = "intermediary";

/// Namespace roles used by the mapping providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSettings {
    /// Namespace intermediate tables are merged on; first in canonical tables
    pub source: String,
    /// Namespace mapping tables are joined with the intermediate table on
    pub join: String,
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_NAMESPACE.to_string(),
            join: DEFAULT_JOIN_NAMESPACE.to_string(),
        }
    }
}

/// External collaborators used by the pipeline
#[derive(Clone)]
pub struct Collaborators {
    pub reader: Arc<dyn ArtifactReader>,
    pub archiver: Arc<dyn Archiver>,
    pub merger: Arc<dyn TableMerger>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            reader: Arc::new(JarArchive),
            archiver: Arc::new(JarArchive),
            merger: Arc::new(JoinMerger),
        }
    }
}

/// A library declared by installer metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerLibrary {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Installer metadata found in a classpath artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallerData {
    /// Version of the dependency that carried the metadata
    pub version: String,
    /// Artifact the metadata was read from
    pub artifact: PathBuf,
    /// Libraries shared by every environment
    pub libraries: Vec<InstallerLibrary>,
}

#[derive(Deserialize)]
struct InstallerJson {
    libraries: InstallerLibraries,
}

#[derive(Deserialize)]
struct InstallerLibraries {
    #[serde(default)]
    common: Vec<InstallerLibrary>,
}

impl InstallerData {
    /// Parse an installer JSON document
    pub fn parse(version: &str, artifact: PathBuf, bytes: &[u8]) -> ForgeResult<Self> {
        let json: InstallerJson = serde_json::from_slice(bytes)?;
        Ok(Self {
            version: version.to_string(),
            artifact,
            libraries: json.libraries.common,
        })
    }
}

/// Immutable run configuration plus single-assignment discoveries
pub struct BuildContext {
    refresh: bool,
    platform_version: String,
    namespaces: NamespaceSettings,
    store: TableStore,
    collaborators: Collaborators,
    installer: OnceLock<InstallerData>,
}

impl BuildContext {
    /// Create a context over a store for one platform version
    pub fn new(store: TableStore, platform_version: impl Into<String>) -> Self {
        Self {
            refresh: false,
            platform_version: platform_version.into(),
            namespaces: NamespaceSettings::default(),
            store,
            collaborators: Collaborators::default(),
            installer: OnceLock::new(),
        }
    }

    /// Build a context from loaded configuration.
    ///
    /// `platform_version` overrides the configured one when given.
    pub fn from_config(config: &Config, platform_version: Option<&str>) -> ForgeResult<Self> {
        let version = platform_version
            .map(str::to_string)
            .or_else(|| config.platform.version.clone())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ForgeError::Configuration(
                    "platform version is not set (manifest or [platform] version)".to_string(),
                )
            })?;

        let root = config
            .cache
            .root
            .clone()
            .unwrap_or_else(ConfigManager::default_cache_root);

        Ok(Self::new(TableStore::new(root), version)
            .with_refresh(config.cache.refresh)
            .with_namespaces(&config.namespaces.source, &config.namespaces.join))
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_namespaces(mut self, source: &str, join: &str) -> Self {
        self.namespaces = NamespaceSettings {
            source: source.to_string(),
            join: join.to_string(),
        };
        self
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Whether cached files must be recomputed
    pub fn refresh(&self) -> bool {
        self.refresh
    }

    pub fn platform_version(&self) -> &str {
        &self.platform_version
    }

    pub fn namespaces(&self) -> &NamespaceSettings {
        &self.namespaces
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Installer metadata, once discovered
    pub fn installer(&self) -> Option<&InstallerData> {
        self.installer.get()
    }

    /// Forget installer metadata found by a previous run
    pub(crate) fn clear_installer(&mut self) {
        self.installer.take();
    }

    /// Record installer metadata. The first value wins; a later value is
    /// handed back unchanged.
    pub fn set_installer(&self, data: InstallerData) -> Result<(), InstallerData> {
        self.installer.set(data)
    }
}
