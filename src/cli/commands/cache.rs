//! Cache command - inspect and clear the table store

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::ForgeResult;
use crate::store::{format_bytes, list_entries, CacheEntry, TableStore};
use crate::ui::{self, UiContext};
use console::style;
use std::path::Path;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> ForgeResult<()> {
    let root = args
        .cache_dir
        .or_else(|| config.cache.root.clone())
        .unwrap_or_else(ConfigManager::default_cache_root);
    let store = TableStore::new(root);

    match args.action {
        CacheAction::Path => {
            println!("{}", store.root().display());
            Ok(())
        }
        CacheAction::List { format } => list_cache(&store, format),
        CacheAction::Clean { yes } => clean_cache(&store, yes).await,
    }
}

fn list_cache(store: &TableStore, format: OutputFormat) -> ForgeResult<()> {
    let entries = list_entries(store.root())?;

    match format {
        OutputFormat::Table => print_table(store.root(), &entries),
        OutputFormat::Json => print_json(store.root(), &entries)?,
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.path.display());
            }
        }
    }

    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn print_table(root: &Path, entries: &[CacheEntry]) {
    if entries.is_empty() {
        println!("No cached tables in {}", root.display());
        return;
    }

    println!(
        "{:<56} {:>10} {:<14} {:<16}",
        "FILE", "SIZE", "FINGERPRINT", "MODIFIED"
    );
    println!("{}", "-".repeat(98));

    let mut total = 0;
    for entry in entries {
        total += entry.size;
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<56} {:>10} {:<14} {:<16}",
            relative(root, &entry.path),
            format_bytes(entry.size),
            style(&entry.fingerprint).dim(),
            modified
        );
    }

    println!();
    println!("Total: {} file(s), {}", entries.len(), format_bytes(total));
}

fn print_json(root: &Path, entries: &[CacheEntry]) -> ForgeResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson {
        file: String,
        size: u64,
        fingerprint: String,
        modified: Option<String>,
    }

    let json: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            file: relative(root, &e.path),
            size: e.size,
            fingerprint: e.fingerprint.clone(),
            modified: e.modified.map(|m| m.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn clean_cache(store: &TableStore, yes: bool) -> ForgeResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    if !store.root().exists() {
        ui::step_info(&ctx, "Table store is empty");
        return Ok(());
    }

    let confirmed = ui::confirm(
        &ctx,
        &format!("Remove cached tables under {}?", store.root().display()),
        false,
    )
    .await?;
    if !confirmed {
        ui::step_warn_hint(&ctx, "Cache left untouched", "pass --yes to skip the prompt");
        return Ok(());
    }

    let removed = store.clean().await?;
    ui::step_ok(&ctx, &format!("Removed {} cached file(s)", removed));
    Ok(())
}
