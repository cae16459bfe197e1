//! tinyforge CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tinyforge::cli::{Cli, Commands, LogFormat};
use tinyforge::config::ConfigManager;
use tinyforge::error::ForgeResult;
use tinyforge::ui;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ForgeResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("tinyforge=warn"),
        1 => EnvFilter::new("tinyforge=info"),
        _ => EnvFilter::new("tinyforge=debug"),
    };
    let json_logs = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.general.log_format == "json",
    };

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    ui::init_theme();
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Run(args) => tinyforge::cli::commands::run(args, &config).await,
        Commands::Namespaces(args) => tinyforge::cli::commands::namespaces(args, &config).await,
        Commands::Reorder(args) => tinyforge::cli::commands::reorder(args).await,
        Commands::Merge(args) => tinyforge::cli::commands::merge(args).await,
        Commands::Cache(args) => tinyforge::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            tinyforge::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
