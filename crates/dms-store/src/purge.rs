// purge.rs — Permanent removal of obsolete revisions and workspace snapshots.
//
// Purge is the only way anything leaves the store for good. Matching is done
// by the filename codec alone; no other state is consulted.
//
// A failure while removing one entry aborts the whole call. Entries removed
// before the failure stay removed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use walkdir::WalkDir;

use crate::codec::{self, ObsoleteTag};
use crate::error::{DmsError, DmsResult};
use crate::store::{require, require_key, Workspace};

impl Workspace {
    /// Hard-delete obsolete revisions in `directory`.
    ///
    /// - `original_key`: only revisions of this key
    /// - `obsolete_before`: only revisions superseded strictly before this
    ///   local time
    ///
    /// Returns the number of files removed, `0` if the directory does not
    /// exist.
    pub fn purge(
        &self,
        directory: &str,
        original_key: Option<&str>,
        obsolete_before: Option<NaiveDateTime>,
    ) -> DmsResult<usize> {
        self.ensure_active()?;
        require("directory", directory)?;
        if let Some(key) = original_key {
            require_key(key)?;
        }
        let Some(dir) = self.existing_dir(directory)? else {
            return Ok(0);
        };

        let doomed = matching_entries(&dir, |name| {
            codec::matches(name, original_key, obsolete_before)
        })?;
        for path in &doomed {
            tracing::info!("hard deleting {}", path.display());
            fs::remove_file(path).map_err(|source| DmsError::io(path, source))?;
        }
        Ok(doomed.len())
    }

    /// Hard-delete soft-deleted snapshots of this workspace, optionally only
    /// those deleted strictly before `obsolete_before`.
    ///
    /// Works whether or not this handle is currently deleted. Returns the
    /// number of snapshots removed, not the number of files.
    pub fn purge_workspace(&self, obsolete_before: Option<NaiveDateTime>) -> DmsResult<usize> {
        let parent = self.path.parent().ok_or_else(|| DmsError::InvalidArgument {
            what: "workspace",
            value: self.name.clone(),
        })?;
        purge_snapshots(parent, &self.name, obsolete_before)
    }
}

/// Hard-delete `_DEL_` snapshots of workspace `name` under `base_path`.
/// Nothing is created; the live workspace directory is never touched.
pub(crate) fn purge_snapshots(
    base_path: &Path,
    name: &str,
    obsolete_before: Option<NaiveDateTime>,
) -> DmsResult<usize> {
    let doomed = matching_entries(base_path, |entry| {
        codec::decode(entry).is_some_and(|decoded| {
            decoded.tag == ObsoleteTag::Deleted
                && decoded.original == name
                && obsolete_before.is_none_or(|cutoff| decoded.timestamp < cutoff)
        })
    })?;
    for snapshot in &doomed {
        remove_tree(snapshot)?;
    }
    Ok(doomed.len())
}

/// Entries of `dir` whose file name satisfies `keep`.
///
/// The directory handle is closed before this returns, so callers can
/// remove the returned paths.
fn matching_entries(dir: &Path, keep: impl Fn(&str) -> bool) -> DmsResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| DmsError::io(dir, source))?;
    let mut matched = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DmsError::io(dir, source))?;
        if entry.file_name().to_str().is_some_and(&keep) {
            matched.push(entry.path());
        }
    }
    Ok(matched)
}

/// Remove `root` and everything under it, deepest entries first.
fn remove_tree(root: &Path) -> DmsResult<()> {
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            DmsError::io(path, e.into())
        })?;
        let path = entry.path();
        tracing::info!("recursively hard deleting {}", path.display());
        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        removed.map_err(|source| DmsError::io(path, source))?;
    }
    Ok(())
}
