//! Reorder and merge commands - run a single transform on tiny files

use crate::cli::args::{MergeArgs, ReorderArgs};
use crate::error::{ForgeError, ForgeResult};
use crate::transform::{reorder_file, JoinMerger, TableMerger};
use crate::ui::{self, UiContext};

/// Execute the reorder command
pub async fn reorder(args: ReorderArgs) -> ForgeResult<()> {
    if !args.input.exists() {
        return Err(ForgeError::PathNotFound(args.input));
    }

    let order: Vec<&str> = args.order.iter().map(String::as_str).collect();
    reorder_file(&args.input, &args.output, &order).await?;

    let ctx = UiContext::detect();
    ui::step_ok_detail(&ctx, "Reordered", &args.output.display().to_string());
    Ok(())
}

/// Execute the merge command
pub async fn merge(args: MergeArgs) -> ForgeResult<()> {
    if let Some(missing) = args.inputs.iter().find(|p| !p.exists()) {
        return Err(ForgeError::PathNotFound(missing.clone()));
    }

    JoinMerger.merge(&args.inputs, &args.output).await?;

    let ctx = UiContext::detect();
    ui::step_ok_detail(
        &ctx,
        &format!("Merged {} tables", args.inputs.len()),
        &args.output.display().to_string(),
    );
    Ok(())
}
