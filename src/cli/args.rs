//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// playctl - local edit, lock and idempotency state for publishing
///
/// Inspects and maintains the state that keeps concurrent publishing
/// runs on this machine from conflicting.
#[derive(Parser, Debug)]
#[command(name = "playctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PLAYCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding locks, edits, cache and ledger
    #[arg(long, global = true, env = "PLAYCTL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and delete persisted edits
    Edit(EditArgs),

    /// Inspect or force-release package locks
    Lock(LockArgs),

    /// Hash an artifact, optionally recording it in the cache
    Hash(HashArgs),

    /// Remove expired cache and idempotency entries
    Gc,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the edit command
#[derive(Parser, Debug)]
pub struct EditArgs {
    #[command(subcommand)]
    pub action: EditAction,
}

/// Edit subcommands
#[derive(Subcommand, Debug)]
pub enum EditAction {
    /// List edits for a package
    List {
        /// Package name (e.g., com.example.app)
        package: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one edit as JSON
    Show {
        /// Package name
        package: String,

        /// Edit handle
        #[arg(default_value = crate::edit::DEFAULT_HANDLE)]
        handle: String,
    },

    /// Delete an edit record
    Delete {
        /// Package name
        package: String,

        /// Edit handle
        #[arg(default_value = crate::edit::DEFAULT_HANDLE)]
        handle: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete expired edits for a package
    Prune {
        /// Package name
        package: String,
    },
}

/// Arguments for the lock command
#[derive(Parser, Debug)]
pub struct LockArgs {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Lock subcommands
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show who holds a package lock
    Status {
        /// Package name
        package: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove a package lock regardless of holder
    Release {
        /// Package name
        package: String,

        /// Release even if the holder looks alive
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the hash command
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Artifact file to hash
    pub file: PathBuf,

    /// Record the hash in this package's artifact cache
    #[arg(short, long)]
    pub package: Option<String>,

    /// Version hint stored with the cache entry
    #[arg(long, requires = "package")]
    pub version_hint: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_edit_list() {
        let cli = Cli::parse_from(["playctl", "edit", "list", "com.example.app"]);
        match cli.command {
            Commands::Edit(EditArgs {
                action: EditAction::List { package, format },
            }) => {
                assert_eq!(package, "com.example.app");
                assert!(matches!(format, OutputFormat::Table));
            }
            _ => panic!("expected Edit List command"),
        }
    }

    #[test]
    fn cli_edit_handle_defaults() {
        let cli = Cli::parse_from(["playctl", "edit", "show", "com.example.app"]);
        match cli.command {
            Commands::Edit(EditArgs {
                action: EditAction::Show { handle, .. },
            }) => assert_eq!(handle, "default"),
            _ => panic!("expected Edit Show command"),
        }
    }

    #[test]
    fn cli_parses_edit_delete_yes() {
        let cli = Cli::parse_from(["playctl", "edit", "delete", "com.example.app", "rel1", "-y"]);
        match cli.command {
            Commands::Edit(EditArgs {
                action: EditAction::Delete { handle, yes, .. },
            }) => {
                assert_eq!(handle, "rel1");
                assert!(yes);
            }
            _ => panic!("expected Edit Delete command"),
        }
    }

    #[test]
    fn cli_parses_lock_release() {
        let cli = Cli::parse_from(["playctl", "lock", "release", "com.example.app", "--force"]);
        match cli.command {
            Commands::Lock(LockArgs {
                action: LockAction::Release { package, force },
            }) => {
                assert_eq!(package, "com.example.app");
                assert!(force);
            }
            _ => panic!("expected Lock Release command"),
        }
    }

    #[test]
    fn cli_parses_hash_with_package() {
        let cli = Cli::parse_from(["playctl", "hash", "app.aab", "-p", "com.example.app"]);
        match cli.command {
            Commands::Hash(args) => {
                assert_eq!(args.file, PathBuf::from("app.aab"));
                assert_eq!(args.package.as_deref(), Some("com.example.app"));
                assert!(args.version_hint.is_none());
            }
            _ => panic!("expected Hash command"),
        }
    }

    #[test]
    fn cli_version_hint_requires_package() {
        let result = Cli::try_parse_from(["playctl", "hash", "app.aab", "--version-hint", "42"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_gc() {
        let cli = Cli::parse_from(["playctl", "gc"]);
        assert!(matches!(cli.command, Commands::Gc));
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::parse_from(["playctl", "gc", "-vv", "--data-dir", "/tmp/playctl"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/playctl")));
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::parse_from(["playctl", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected Config Init command"),
        }
    }
}
