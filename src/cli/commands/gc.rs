//! Gc command - sweep expired cache and ledger entries

use crate::coordinator::Coordinator;
use crate::error::PlayctlResult;
use crate::ui::{self, TaskSpinner, UiContext};
use tokio_util::sync::CancellationToken;

/// Execute the gc command
pub async fn execute(coordinator: &Coordinator, cancel: &CancellationToken) -> PlayctlResult<()> {
    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Sweeping expired entries...");

    let report = match coordinator.clean_expired(cancel).await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error("Sweep failed");
            return Err(e);
        }
    };

    spinner.stop(&format!(
        "Removed {} of {} entries",
        report.removed, report.scanned
    ));
    if report.skipped > 0 {
        ui::step_warn_hint(
            &ctx,
            &format!("Skipped {} unreadable entries", report.skipped),
            "Run with -v for details",
        );
    }

    Ok(())
}
