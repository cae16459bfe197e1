//! Namespaces command - print the intermediate table's namespaces

use super::run::Pipeline;
use crate::cli::args::NamespacesArgs;
use crate::config::Config;
use crate::error::{ForgeError, ForgeResult};
use crate::provider::IntermediateMappingsProvider;

/// Execute the namespaces command. Prints one namespace per line.
pub async fn execute(args: NamespacesArgs, config: &Config) -> ForgeResult<()> {
    let mut pipeline = Pipeline::load(&args.pipeline, config).await?;
    pipeline.run().await?;

    let provider = pipeline
        .orchestrator
        .registry()
        .lookup::<IntermediateMappingsProvider>()
        .ok_or_else(|| ForgeError::Internal("intermediate provider missing".to_string()))?;

    let excluded: Vec<&str> = args.except.iter().map(String::as_str).collect();
    for namespace in provider.namespaces_except(&excluded) {
        println!("{}", namespace);
    }
    Ok(())
}
