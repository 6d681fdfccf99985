//! Hash command - hash an artifact and optionally cache the result

use crate::artifact::{hash_file, HashProgress, PROGRESS_THRESHOLD};
use crate::cli::args::HashArgs;
use crate::coordinator::Coordinator;
use crate::error::PlayctlResult;
use crate::ui::{self, ByteProgress, UiContext};
use tokio::fs;
use tracing::debug;

/// Execute the hash command
pub async fn execute(args: HashArgs, coordinator: &Coordinator) -> PlayctlResult<()> {
    let ctx = UiContext::detect();
    let label = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    // Missing files are reported by hash_file
    let size = fs::metadata(&args.file).await.map(|m| m.len()).ok();
    let progress = size
        .filter(|size| *size > PROGRESS_THRESHOLD)
        .map(|size| ByteProgress::new(&ctx, &label, size));

    let hash = match progress {
        Some(ref progress) => {
            let report = |done: u64, total: u64| progress.update(done, total);
            let report: HashProgress<'_> = &report;
            let hash = hash_file(&args.file, Some(report)).await;
            progress.finish(size.unwrap_or_default());
            hash?
        }
        None => hash_file(&args.file, None).await?,
    };

    println!("{}  {}", hash, args.file.display());

    let Some(package) = args.package else {
        return Ok(());
    };

    let artifacts = coordinator.artifacts();
    if let Some(entry) = artifacts.get_by_hash(&package, &hash).await? {
        debug!("Artifact already cached until {}", entry.expires_at);
        ui::step_info(
            &ctx,
            &format!("Already cached for {} (expires {})", package, entry.expires_at.to_rfc3339()),
        );
        return Ok(());
    }

    let entry = artifacts
        .cache_with_hash(&package, &args.file, &hash, args.version_hint.as_deref())
        .await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Cached for {}", package),
        &format!("expires {}", entry.expires_at.to_rfc3339()),
    );
    Ok(())
}
