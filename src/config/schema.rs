//! Configuration schema for tinyforge
//!
//! Configuration is stored at `~/.config/tinyforge/config.toml`

use crate::context::{DEFAULT_JOIN_NAMESPACE, DEFAULT_SOURCE_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Table store settings
    pub cache: CacheConfig,

    /// Target platform
    pub platform: PlatformConfig,

    /// Namespace roles
    pub namespaces: NamespaceConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Table store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store root (defaults to the user cache directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Recompute every cached table on each run
    pub refresh: bool,
}

/// Platform configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Platform version used when the build manifest sets none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Namespace roles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Namespace every intermediate table must carry; leads canonical tables
    pub source: String,

    /// Namespace mapping tables are joined on
    pub join: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_NAMESPACE.to_string(),
            join: DEFAULT_JOIN_NAMESPACE.to_string(),
        }
    }
}

impl Config {
    /// Check values serde cannot: the log format name and the namespace
    /// roles
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        if self.namespaces.source.is_empty() || self.namespaces.join.is_empty() {
            return Err("namespaces.source and namespaces.join must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[namespaces]"));
        assert!(toml.contains("source = \"official\""));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[cache]
refresh = true

[namespaces]
join = "hashed"
"#,
        )
        .unwrap();
        assert!(config.cache.refresh);
        assert!(config.cache.root.is_none());
        assert_eq!(config.namespaces.source, "official");
        assert_eq!(config.namespaces.join, "hashed");
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.general.log_format = "yaml".to_string();
        assert!(config.validate().unwrap_err().contains("yaml"));
    }

    #[test]
    fn validate_rejects_empty_namespace() {
        let mut config = Config::default();
        config.namespaces.join.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn platform_version_roundtrips() {
        let mut config = Config::default();
        config.platform.version = Some("1.17.1".to_string());
        let toml = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&toml).unwrap();
        assert_eq!(back.platform.version.as_deref(), Some("1.17.1"));
    }
}
