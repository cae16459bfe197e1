//! Error types for tinyforge
//!
//! All modules use `ForgeResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tinyforge operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// All errors that can occur while preparing mapping tables
#[derive(Error, Debug)]
pub enum ForgeError {
    // Registration / configuration errors
    #[error("Provider of kind '{kind}' is already registered")]
    DuplicateProvider { kind: &'static str },

    #[error("Invalid provider configuration: {0}")]
    Configuration(String),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Slot arity errors
    #[error("No '{slot}' dependency was specified")]
    MissingDependency { slot: String },

    #[error("Only one '{slot}' dependency should be specified, but {count} were")]
    Multiplicity { slot: String, count: usize },

    // Table precondition errors
    #[error("Could not find mappings in {coordinate}: none of [{searched}] exist in {artifact}")]
    MissingTable {
        coordinate: String,
        artifact: PathBuf,
        searched: String,
    },

    #[error("All '{slot}' dependencies must contain the namespace {namespace} ({coordinate} doesn't)")]
    MissingNamespace {
        slot: String,
        namespace: String,
        coordinate: String,
    },

    #[error("V1 tiny mappings are not supported for {coordinate}")]
    UnsupportedFormat { coordinate: String },

    #[error("Could not detect mapping format of {path}: {reason}")]
    FormatDetection { path: PathBuf, reason: String },

    #[error("Malformed mapping table {path}:{line}: {reason}")]
    TableParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Mapping transform failed on [{inputs}]: {reason}")]
    Transform { inputs: String, reason: String },

    // Wrapping errors, one per boundary
    #[error("Failed to provide {coordinate} to '{slot}': {source}")]
    Provide {
        coordinate: String,
        slot: String,
        #[source]
        source: Box<ForgeError>,
    },

    #[error("Failed to provide dependencies for '{slot}': {source}")]
    SlotFailed {
        slot: String,
        #[source]
        source: Box<ForgeError>,
    },

    #[error("Deferred action '{action}' failed: {source}")]
    Deferred {
        action: String,
        #[source]
        source: Box<ForgeError>,
    },

    // Artifact errors
    #[error("Failed to read artifact {path}: {reason}")]
    ArtifactRead { path: PathBuf, reason: String },

    #[error("Failed to package {path}: {reason}")]
    ArtifactWrite { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transform error naming the files involved
    pub fn transform(inputs: &[PathBuf], reason: impl Into<String>) -> Self {
        Self::Transform {
            inputs: inputs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            reason: reason.into(),
        }
    }

    /// Wrap an error raised while providing a dependency to a slot
    pub fn provide(coordinate: impl Into<String>, slot: impl Into<String>, source: Self) -> Self {
        Self::Provide {
            coordinate: coordinate.into(),
            slot: slot.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error that aborted a whole slot group
    pub fn slot_failed(slot: impl Into<String>, source: Self) -> Self {
        Self::SlotFailed {
            slot: slot.into(),
            source: Box::new(source),
        }
    }

    /// Strip slot/provide/deferred wrappers down to the original failure
    pub fn root_cause(&self) -> &ForgeError {
        match self {
            Self::Provide { source, .. }
            | Self::SlotFailed { source, .. }
            | Self::Deferred { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self.root_cause() {
            Self::UnsupportedFormat { .. } => {
                Some("Intermediate mappings must be tiny v2; re-publish the artifact in v2 format")
            }
            Self::MissingDependency { .. } => Some("Declare the dependency in tinyforge.toml"),
            Self::TableParse { .. } | Self::Transform { .. } => {
                Some("The cache may hold stale files; re-run with --refresh")
            }
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for ForgeError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(source) => Self::io("zip archive", source),
            other => Self::Internal(format!("zip archive: {}", other)),
        }
    }
}
