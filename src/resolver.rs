//! Dependency resolution collaborator
//!
//! The pipeline never resolves coordinates itself. A [`DependencyResolver`]
//! hands it, per slot, the declared dependencies with their local artifact
//! files. [`BuildManifest`] is the file-backed resolver used by the CLI.

use crate::error::{ForgeError, ForgeResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Group used for artifacts produced during a run
pub const LOCAL_GROUP: &str = "local";

/// A declared dependency resolved to a local artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    pub group: String,
    pub name: String,
    pub version: String,
    pub classifier: Option<String>,
    pub artifact: PathBuf,
}

impl ResolvedDependency {
    /// Parse `group:name:version[:classifier]`
    pub fn parse(coordinate: &str, artifact: impl Into<PathBuf>) -> ForgeResult<Self> {
        let parts: Vec<&str> = coordinate.split(':').collect();
        let (group, name, version, classifier) = match parts.as_slice() {
            [g, n, v] => (g, n, v, None),
            [g, n, v, c] => (g, n, v, Some(c.to_string())),
            _ => {
                return Err(ForgeError::Configuration(format!(
                    "invalid dependency coordinate '{}': expected group:name:version[:classifier]",
                    coordinate
                )))
            }
        };
        if [group, name, version].iter().any(|p| p.is_empty()) {
            return Err(ForgeError::Configuration(format!(
                "invalid dependency coordinate '{}': empty component",
                coordinate
            )));
        }

        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            classifier,
            artifact: artifact.into(),
        })
    }

    /// A file produced during the run
    pub fn local(name: &str, version: &str, artifact: impl Into<PathBuf>) -> Self {
        Self {
            group: LOCAL_GROUP.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            classifier: None,
            artifact: artifact.into(),
        }
    }

    /// Full coordinate string
    pub fn coordinate(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(ref classifier) = self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

/// Hands out the declared dependencies of a slot
pub trait DependencyResolver: Send + Sync {
    /// Dependencies declared for `slot`, in declaration order
    fn dependencies(&self, slot: &str) -> Vec<ResolvedDependency>;
}

/// In-memory resolver
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    slots: IndexMap<String, Vec<ResolvedDependency>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dependency for a slot
    pub fn declare(&mut self, slot: &str, dependency: ResolvedDependency) -> &mut Self {
        self.slots
            .entry(slot.to_string())
            .or_default()
            .push(dependency);
        self
    }

    /// Builder-style [`StaticResolver::declare`]
    pub fn with(mut self, slot: &str, dependency: ResolvedDependency) -> Self {
        self.declare(slot, dependency);
        self
    }

    /// Slots with at least one declaration
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

impl DependencyResolver for StaticResolver {
    fn dependencies(&self, slot: &str) -> Vec<ResolvedDependency> {
        self.slots.get(slot).cloned().unwrap_or_default()
    }
}

/// `tinyforge.toml`: the project's declared dependencies
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildManifest {
    /// Platform version the mappings target
    #[serde(default)]
    pub platform_version: Option<String>,

    /// Declared dependencies
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DeclaredDependency>,
}

/// One `[[dependency]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct DeclaredDependency {
    pub slot: String,
    pub coordinate: String,
    /// Artifact path, relative to the manifest's directory
    pub artifact: PathBuf,
}

impl BuildManifest {
    /// Parse a manifest from a TOML string
    pub fn parse(content: &str) -> ForgeResult<Self> {
        toml::from_str(content).map_err(|e| ForgeError::ConfigInvalid {
            path: "tinyforge.toml".into(),
            reason: e.to_string(),
        })
    }

    /// Parse a manifest file from disk
    pub async fn from_file(path: &Path) -> ForgeResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ForgeError::io(format!("reading manifest {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| ForgeError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Turn the declarations into a resolver, anchoring relative artifact
    /// paths at `base_dir`
    pub fn resolver(&self, base_dir: &Path) -> ForgeResult<StaticResolver> {
        let mut resolver = StaticResolver::new();
        for declared in &self.dependencies {
            let artifact = if declared.artifact.is_absolute() {
                declared.artifact.clone()
            } else {
                base_dir.join(&declared.artifact)
            };
            if !artifact.exists() {
                return Err(ForgeError::PathNotFound(artifact));
            }
            resolver.declare(
                &declared.slot,
                ResolvedDependency::parse(&declared.coordinate, artifact)?,
            );
        }
        Ok(resolver)
    }
}
