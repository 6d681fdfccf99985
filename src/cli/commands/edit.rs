//! Edit command - inspect and delete persisted edits

use crate::cli::args::{EditAction, EditArgs, OutputFormat};
use crate::coordinator::Coordinator;
use crate::edit::{Edit, EditState, EditStore};
use crate::error::{PlayctlError, PlayctlResult};
use crate::ui::{self, UiContext};
use chrono::Utc;
use console::style;

/// Execute the edit command
pub async fn execute(args: EditArgs, coordinator: &Coordinator) -> PlayctlResult<()> {
    let store = coordinator.edits();

    match args.action {
        EditAction::List { package, format } => list_edits(store, &package, format).await,
        EditAction::Show { package, handle } => show_edit(store, &package, &handle).await,
        EditAction::Delete {
            package,
            handle,
            yes,
        } => delete_edit(store, &package, &handle, yes).await,
        EditAction::Prune { package } => prune_edits(store, &package).await,
    }
}

async fn list_edits(store: &EditStore, package: &str, format: OutputFormat) -> PlayctlResult<()> {
    let edits = store.list(package).await?;

    if edits.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("No edits for {}", package));
            }
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(store, &edits),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&edits)?),
        OutputFormat::Plain => {
            for edit in &edits {
                println!("{}", edit.handle);
            }
        }
    }

    Ok(())
}

fn print_table(store: &EditStore, edits: &[Edit]) {
    let now = Utc::now();

    println!(
        "{:<20} {:<12} {:<18} {:<18} {:<24}",
        style("HANDLE").bold(),
        style("STATE").bold(),
        style("CREATED").bold(),
        style("LAST USED").bold(),
        style("SERVER ID").bold()
    );
    println!("{}", "-".repeat(92));

    for edit in edits {
        let state = if store.is_expired(edit, now) {
            style("expired".to_string()).dim()
        } else {
            match edit.state {
                EditState::Draft => style(edit.state.to_string()).cyan(),
                EditState::Validating => style(edit.state.to_string()).yellow(),
                EditState::Committed => style(edit.state.to_string()).green(),
                EditState::Aborted => style(edit.state.to_string()).red(),
            }
        };

        println!(
            "{:<20} {:<12} {:<18} {:<18} {:<24}",
            edit.handle,
            state,
            edit.created_at.format("%Y-%m-%d %H:%M"),
            edit.last_used_at.format("%Y-%m-%d %H:%M"),
            edit.server_id
        );
    }

    println!();
    println!("{} edit(s)", edits.len());
}

async fn show_edit(store: &EditStore, package: &str, handle: &str) -> PlayctlResult<()> {
    let edit = store
        .load(package, handle)
        .await?
        .ok_or_else(|| PlayctlError::edit_not_found(package, handle))?;

    println!("{}", serde_json::to_string_pretty(&edit)?);
    Ok(())
}

async fn delete_edit(store: &EditStore, package: &str, handle: &str, yes: bool) -> PlayctlResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    // Fail on a missing edit before prompting
    if store.load(package, handle).await?.is_none() {
        return Err(PlayctlError::edit_not_found(package, handle));
    }

    let prompt = format!("Delete edit {} for {}?", handle, package);
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Edit not deleted", "Pass --yes to skip the prompt");
        return Ok(());
    }

    store.delete(package, handle).await?;
    ui::step_ok(&ctx, &format!("Deleted edit {} for {}", handle, package));
    Ok(())
}

async fn prune_edits(store: &EditStore, package: &str) -> PlayctlResult<()> {
    let ctx = UiContext::detect();
    let pruned = store.prune_expired(package, Utc::now()).await?;

    if pruned.is_empty() {
        ui::step_info(&ctx, &format!("No expired edits for {}", package));
    } else {
        for handle in &pruned {
            ui::remark(&ctx, handle);
        }
        ui::step_ok(&ctx, &format!("Pruned {} expired edit(s)", pruned.len()));
    }

    Ok(())
}
