//! Confirmation prompt with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{ForgeError, ForgeResult};

/// Ask for confirmation. Auto-yes approves, non-interactive sessions get
/// `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> ForgeResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| ForgeError::Internal(format!("prompt task failed: {}", e)))?;

    result.map_err(|e| ForgeError::io("reading confirmation", e))
}
