//! Run command - build canonical tables for a project

use crate::cli::args::{PipelineArgs, RunArgs};
use crate::config::Config;
use crate::context::BuildContext;
use crate::error::{ForgeError, ForgeResult};
use crate::orchestrator::{Orchestrator, RunReport};
use crate::provider::{slots, IntermediateMappingsProvider, MappingsProvider, ModClasspathProvider};
use crate::resolver::{BuildManifest, StaticResolver};
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::Path;
use tracing::debug;

/// An orchestrator with its providers registered, plus the manifest's
/// declarations
pub struct Pipeline {
    pub orchestrator: Orchestrator,
    pub resolver: StaticResolver,
}

impl Pipeline {
    /// Load the manifest and register the standard providers
    pub async fn load(args: &PipelineArgs, config: &Config) -> ForgeResult<Self> {
        if !args.manifest.exists() {
            return Err(ForgeError::PathNotFound(args.manifest.clone()));
        }
        let manifest = BuildManifest::from_file(&args.manifest).await?;
        let base_dir = args
            .manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let resolver = manifest.resolver(base_dir)?;

        let mut config = config.clone();
        if let Some(ref dir) = args.cache_dir {
            config.cache.root = Some(dir.clone());
        }
        config.cache.refresh |= args.refresh;

        let context = BuildContext::from_config(&config, manifest.platform_version.as_deref())?;
        debug!("Table store at {}", context.store().root().display());

        let mut orchestrator = Orchestrator::new(context);
        orchestrator.register(IntermediateMappingsProvider::new())?;
        orchestrator.register(MappingsProvider::new())?;
        if resolver
            .slots()
            .any(|slot| slot == slots::MOD_COMPILE_CLASSPATH)
        {
            orchestrator.register(ModClasspathProvider::new())?;
        }

        Ok(Self {
            orchestrator,
            resolver,
        })
    }

    pub async fn run(&mut self) -> ForgeResult<RunReport> {
        self.orchestrator
            .resolve_dependencies(&self.resolver)
            .await
    }
}

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> ForgeResult<()> {
    let mut pipeline = Pipeline::load(&args.pipeline, config).await?;

    if args.json {
        let report = pipeline.run().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let ctx = UiContext::detect();
    ui::intro(&ctx, "tinyforge");

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Preparing mapping tables...");
    let report = match pipeline.run().await {
        Ok(report) => {
            spinner.stop("Mapping tables ready");
            report
        }
        Err(e) => {
            spinner.stop_error("Mapping tables failed");
            return Err(e);
        }
    };

    print_summary(&ctx, &pipeline, &report);
    Ok(())
}

fn print_summary(ctx: &UiContext, pipeline: &Pipeline, report: &RunReport) {
    ui::section(ctx, "Canonical tables");
    for table in &report.canonical {
        ui::step_ok_detail(
            ctx,
            &table.identity.to_string(),
            &table.namespaces.join(", "),
        );
        ui::key_value(ctx, "table", &table.table.display().to_string());
        ui::key_value(ctx, "artifact", &table.artifact.display().to_string());
    }

    let orchestrator = &pipeline.orchestrator;
    let registry = orchestrator.registry();
    if registry
        .lookup::<MappingsProvider>()
        .is_some_and(|p| !p.is_v2())
    {
        ui::step_warn(ctx, "Mappings use tiny v1 and were promoted without merging");
    }

    let mut complete = true;
    if registry.lookup::<ModClasspathProvider>().is_some() {
        match orchestrator.context().installer() {
            Some(installer) => ui::step_info(
                ctx,
                &format!(
                    "Installer metadata from {} ({} libraries)",
                    installer.artifact.display(),
                    installer.libraries.len()
                ),
            ),
            None => {
                complete = false;
                ui::step_warn_hint(
                    ctx,
                    "No installer metadata found",
                    "add the loader to modCompileClasspath",
                );
            }
        }
    }

    let summary = format!(
        "{} dependencies provided, {} deferred actions run",
        report.calls.len(),
        report.deferred.len()
    );
    if complete {
        ui::outro_success(ctx, &summary);
    } else {
        ui::outro_warn(ctx, &summary);
    }
}
