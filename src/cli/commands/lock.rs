//! Lock command - inspect or force-release package locks

use crate::cli::args::{LockAction, LockArgs, OutputFormat};
use crate::coordinator::Coordinator;
use crate::error::PlayctlResult;
use crate::lock::{BreakOutcome, LockManager, LockStatus};
use crate::ui::{self, UiContext};
use serde_json::json;

/// Execute the lock command
pub async fn execute(args: LockArgs, coordinator: &Coordinator) -> PlayctlResult<()> {
    let locks = coordinator.locks();

    match args.action {
        LockAction::Status { package, format } => show_status(locks, &package, format).await,
        LockAction::Release { package, force } => release_lock(locks, &package, force).await,
    }
}

async fn show_status(locks: &LockManager, package: &str, format: OutputFormat) -> PlayctlResult<()> {
    let status = locks.inspect(package).await?;

    match format {
        OutputFormat::Json => print_json(package, status.as_ref())?,
        OutputFormat::Plain => match status {
            Some(status) => println!("{}", status.health),
            None => println!("unlocked"),
        },
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            match status {
                Some(status) => print_details(&ctx, package, &status),
                None => ui::step_info(&ctx, &format!("{} is not locked", package)),
            }
        }
    }

    Ok(())
}

fn print_details(ctx: &UiContext, package: &str, status: &LockStatus) {
    ui::intro(ctx, &format!("Lock on {}", package));
    ui::key_value(ctx, "path", &status.path.display().to_string());
    ui::key_value_status(ctx, "health", &status.health.to_string(), !status.health.is_stale());

    match status.record {
        Some(ref record) => {
            ui::key_value(ctx, "pid", &record.pid.to_string());
            ui::key_value(ctx, "hostname", &record.hostname);
            ui::key_value(ctx, "command", &record.command);
            ui::key_value(ctx, "created", &record.created_at.to_rfc3339());
            if let Some(heartbeat) = record.heartbeat {
                ui::key_value(ctx, "heartbeat", &heartbeat.to_rfc3339());
            }
        }
        None => ui::remark(ctx, "Lock file is unreadable, possibly mid-write"),
    }
}

fn print_json(package: &str, status: Option<&LockStatus>) -> PlayctlResult<()> {
    let value = match status {
        Some(status) => json!({
            "package": package,
            "locked": true,
            "path": status.path,
            "health": status.health.to_string(),
            "stale": status.health.is_stale(),
            "holder": status.record,
        }),
        None => json!({ "package": package, "locked": false }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn release_lock(locks: &LockManager, package: &str, force: bool) -> PlayctlResult<()> {
    let ctx = UiContext::detect();

    match locks.break_lock(package, force).await? {
        BreakOutcome::Unlocked => ui::step_info(&ctx, &format!("{} is not locked", package)),
        BreakOutcome::Live(_) => ui::step_warn_hint(
            &ctx,
            &format!("Lock on {} looks live", package),
            "Use --force to release it anyway",
        ),
        BreakOutcome::Broken(status) => ui::step_ok_detail(
            &ctx,
            &format!("Released lock on {}", package),
            &status.health.to_string(),
        ),
        BreakOutcome::Replaced => ui::step_warn_hint(
            &ctx,
            &format!("Lock on {} was taken by another process", package),
            "Check it with: playctl lock status",
        ),
    }
    Ok(())
}
