//! Configuration management for tinyforge
//!
//! User settings live in `config.toml` under the platform config directory;
//! a missing file means defaults. The project's dependencies are not
//! configuration, they come from the build manifest (see
//! [`crate::resolver::BuildManifest`]).

pub mod schema;

pub use schema::Config;

use crate::error::{ForgeError, ForgeResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Build manifest looked up in the working directory
pub const MANIFEST_FILE: &str = "tinyforge.toml";

/// Application directory name under the platform config and cache dirs
const APP_DIR: &str = "tinyforge";

/// Loads and saves the user configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `<config dir>/tinyforge/config.toml`
    pub fn default_config_path() -> PathBuf {
        platform_dir(dirs::config_dir()).join("config.toml")
    }

    /// Table store root used when neither the CLI nor the config names one
    pub fn default_cache_root() -> PathBuf {
        platform_dir(dirs::cache_dir())
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing
    pub async fn load(&self) -> ForgeResult<Config> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => parse(&self.config_path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No config at {}, using defaults",
                    self.config_path.display()
                );
                Ok(Config::default())
            }
            Err(e) => Err(ForgeError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )),
        }
    }

    /// Write `config` to the managed path, creating parent directories
    pub async fn save(&self, config: &Config) -> ForgeResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ForgeError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ForgeError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn platform_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

fn parse(path: &Path, content: &str) -> ForgeResult<Config> {
    let invalid = |reason: String| ForgeError::ConfigInvalid {
        path: path.to_path_buf(),
        reason,
    };
    let config: Config = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
    config.validate().map_err(invalid)?;
    Ok(config)
}
