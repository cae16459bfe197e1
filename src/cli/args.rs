//! CLI argument definitions using clap derive

use crate::config::MANIFEST_FILE;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tinyforge - layered mapping table pipeline
///
/// Extracts, reorders and merges tiny mapping tables declared in a build
/// manifest and caches the canonical results.
#[derive(Parser, Debug)]
#[command(name = "tinyforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TINYFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format (overrides [general] log_format)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the manifest's dependencies and build canonical tables
    Run(RunArgs),

    /// Print the namespaces of the canonical intermediate table
    Namespaces(NamespacesArgs),

    /// Reorder the namespaces of a tiny file
    Reorder(ReorderArgs),

    /// Merge tiny files sharing their first namespace
    Merge(MergeArgs),

    /// Inspect or clear the table store
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Options shared by commands that run the pipeline
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Build manifest declaring the dependencies
    #[arg(short, long, default_value = MANIFEST_FILE)]
    pub manifest: PathBuf,

    /// Recompute every cached table
    #[arg(long)]
    pub refresh: bool,

    /// Table store root (overrides [cache] root)
    #[arg(long, env = "TINYFORGE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the namespaces command
#[derive(Parser, Debug)]
pub struct NamespacesArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Namespaces to leave out (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub except: Vec<String>,
}

/// Arguments for the reorder command
#[derive(Parser, Debug)]
pub struct ReorderArgs {
    /// Tiny file to read
    pub input: PathBuf,

    /// Where to write the reordered table
    pub output: PathBuf,

    /// New namespace order (comma-separated permutation)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub order: Vec<String>,
}

/// Arguments for the merge command
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Tiny files to merge, in order
    #[arg(num_args = 2.., required = true)]
    pub inputs: Vec<PathBuf>,

    /// Where to write the merged table
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,

    /// Table store root (overrides [cache] root)
    #[arg(long, global = true, env = "TINYFORGE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print the store root
    Path,

    /// List cached tables and packaged artifacts
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove cached tables and packaged artifacts
    Clean {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
