// workspace.rs — Workspace subcommands: status, delete, reset, purge.
//
// Every `dms` run starts with fresh handles, so these commands look at the
// directory before opening a handle: opening creates the workspace.

use std::io::Write;

use anyhow::bail;
use chrono::NaiveDateTime;
use clap::Subcommand;
use dms_store::DmsFactory;

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// Show the workspace's path and lifecycle state.
    Status,
    /// Soft-delete the workspace. Its content is kept as a tagged snapshot.
    Delete,
    /// Start the workspace over empty, keeping the old content as a snapshot.
    Reset,
    /// Permanently remove soft-deleted snapshots of the workspace.
    Purge {
        /// Only snapshots deleted strictly before this time
        /// ("now", YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS[.fff], local time).
        #[arg(long, value_parser = super::parse_cutoff)]
        before: Option<NaiveDateTime>,
    },
}

pub fn execute(
    cmd: &WorkspaceCommands,
    factory: &DmsFactory,
    name: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match cmd {
        WorkspaceCommands::Status => {
            writeln!(out, "Workspace: {}", name)?;
            writeln!(out, "Path:      {}", factory.base_path().join(name).display())?;
            if factory.workspace_exists(name)? {
                let ws = factory.workspace(name)?;
                writeln!(out, "State:     {}", ws.state())?;
                writeln!(out, "Charset:   {}", ws.charset().name())?;
            } else {
                writeln!(out, "State:     absent")?;
            }
        }
        WorkspaceCommands::Delete => {
            if !factory.workspace_exists(name)? {
                bail!("workspace '{}' doesn't exist", name);
            }
            factory.workspace(name)?.delete_workspace()?;
            writeln!(out, "Deleted workspace '{}'", name)?;
        }
        WorkspaceCommands::Reset => {
            let live = factory.workspace_exists(name)?;
            // Opening an absent workspace already leaves it empty and active.
            let ws = factory.workspace(name)?;
            if live || ws.is_deleted() {
                ws.reset_workspace()?;
            }
            writeln!(out, "Reset workspace '{}'", name)?;
        }
        WorkspaceCommands::Purge { before } => {
            let removed = factory.purge_workspace(name, *before)?;
            writeln!(out, "Purged {} snapshot(s) of '{}'", removed, name)?;
        }
    }
    Ok(())
}
