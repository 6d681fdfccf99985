//! Confirmation prompt with CI fallback

use super::context::UiContext;
use crate::error::{PlayctlError, PlayctlResult};

/// Ask a yes/no question.
///
/// Returns true under `--yes` and `default` when not attached to a
/// terminal.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PlayctlResult<bool> {
    if ctx.auto_yes() {
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
    .map_err(|e| PlayctlError::Internal(format!("prompt task failed: {}", e)))?;

    result.map_err(|e| PlayctlError::User(format!("Prompt failed: {}", e)))
}
