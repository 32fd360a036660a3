//! # dms-cli
//!
//! Command-line interface for the versioned document store.
//!
//! - `dms doc keys/add/put/get/lines/exists/delete/purge` — work with
//!   documents in one workspace
//! - `dms workspace delete/reset/purge` — soft-delete, reset, and reclaim
//!   whole workspaces
//!
//! The base directory comes from `--base-path`, from `--config <dms.toml>`,
//! or from a `dms.toml` in the current directory, in that order.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Versioned soft-delete document store.
#[derive(Parser)]
#[command(name = "dms", version, about)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base directory holding the workspaces. Overrides the config file.
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,

    /// Workspace to operate on.
    #[arg(long, short, global = true, default_value = "default")]
    workspace: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, write, delete and purge documents.
    Doc {
        #[command(subcommand)]
        command: commands::document::DocumentCommands,
    },
    /// Soft-delete, reset and purge the whole workspace.
    Workspace {
        #[command(subcommand)]
        command: commands::workspace::WorkspaceCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; document content goes to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("dms_store=info".parse()?)
                .add_directive("dms=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = commands::resolve_config(cli.config.as_deref(), cli.base_path.as_deref())?;
    let factory = dms_store::DmsFactory::from_config(&config)?;
    tracing::debug!("base path: {}", factory.base_path().display());

    let mut out = std::io::stdout().lock();

    match &cli.command {
        Commands::Doc { command } => {
            let workspace = factory.workspace(&cli.workspace)?;
            commands::document::execute(command, &workspace, &mut out)
        }
        Commands::Workspace { command } => {
            commands::workspace::execute(command, &factory, &cli.workspace, &mut out)
        }
    }
}
