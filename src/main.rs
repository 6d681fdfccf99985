//! playctl - local coordination state for publishing
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use playctl::cli::{Cli, Commands};
use playctl::config::ConfigManager;
use playctl::error::{PlayctlError, PlayctlResult};
use playctl::Coordinator;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(PlayctlError::Cancelled) => {
            eprintln!("{}", style("Cancelled").yellow());
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PlayctlResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;
    if let Some(dir) = cli.data_dir {
        config.general.data_dir = Some(dir);
    }

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Loaded config from {}", config_manager.path().display());

    if let Commands::Config(args) = cli.command {
        return playctl::cli::commands::config(args, &config_manager, &config).await;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let coordinator = Coordinator::from_config(&config).await?;

    match cli.command {
        Commands::Config(_) => Ok(()),
        Commands::Edit(args) => playctl::cli::commands::edit(args, &coordinator).await,
        Commands::Lock(args) => playctl::cli::commands::lock(args, &coordinator).await,
        Commands::Hash(args) => playctl::cli::commands::hash(args, &coordinator).await,
        Commands::Gc => playctl::cli::commands::gc(&coordinator, &cancel).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug. Logs go to stderr so stdout stays
/// parseable.
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("playctl=warn"),
        1 => EnvFilter::new("playctl=info"),
        _ => EnvFilter::new("playctl=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
