// lifecycle.rs — Workspace-level soft delete and reset.
//
// A workspace handle is a two-state machine:
//   Active --delete_workspace()--> Deleted --reset_workspace()--> Active
//
// Soft-deleting renames the whole workspace directory to a `_DEL_`-tagged
// sibling under the base path. The handle then rejects data operations until
// it is reset, which recreates an empty directory at the original path.

use std::fmt;
use std::fs;

use crate::codec::{self, ObsoleteTag};
use crate::error::{DmsError, DmsResult};
use crate::store::{local_now, Workspace};

/// Lifecycle state of a workspace handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// Data operations are allowed.
    Active,
    /// The directory was renamed away; only reset (and workspace purge) work.
    Deleted,
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceState::Active => write!(f, "active"),
            WorkspaceState::Deleted => write!(f, "deleted"),
        }
    }
}

impl WorkspaceState {
    /// Whether moving from this state to `next` is a valid transition.
    pub fn can_transition_to(&self, next: WorkspaceState) -> bool {
        matches!(
            (self, next),
            (WorkspaceState::Active, WorkspaceState::Deleted)
                | (WorkspaceState::Deleted, WorkspaceState::Active)
        )
    }
}

impl Workspace {
    /// Current lifecycle state.
    pub fn state(&self) -> WorkspaceState {
        *self.lock_state()
    }

    /// Whether the handle has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.state() == WorkspaceState::Deleted
    }

    /// Soft-delete the whole workspace.
    ///
    /// Fails with `WorkspaceDeleted` if the handle is already deleted.
    pub fn delete_workspace(&self) -> DmsResult<()> {
        let mut state = self.lock_state();
        if !state.can_transition_to(WorkspaceState::Deleted) {
            return Err(DmsError::WorkspaceDeleted(self.name.clone()));
        }
        self.rename_away()?;
        *state = WorkspaceState::Deleted;
        Ok(())
    }

    /// Soft-delete the workspace (unless already deleted) and start over
    /// with an empty directory.
    pub fn reset_workspace(&self) -> DmsResult<()> {
        let mut state = self.lock_state();
        if *state == WorkspaceState::Active {
            self.rename_away()?;
            *state = WorkspaceState::Deleted;
        }
        fs::create_dir(&self.path).map_err(|source| DmsError::io(&self.path, source))?;
        *state = WorkspaceState::Active;
        tracing::info!("workspace '{}' reset", self.name);
        Ok(())
    }

    fn rename_away(&self) -> DmsResult<()> {
        let target = codec::tagged_sibling(&self.path, ObsoleteTag::Deleted, local_now())
            .ok_or_else(|| DmsError::InvalidArgument {
                what: "workspace",
                value: self.name.clone(),
            })?;
        if target.exists() {
            return Err(DmsError::io(
                &target,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "snapshot already exists"),
            ));
        }
        fs::rename(&self.path, &target).map_err(|source| DmsError::io(&self.path, source))?;
        tracing::info!(
            "workspace '{}' soft-deleted to {}",
            self.name,
            target.display()
        );
        Ok(())
    }
}
