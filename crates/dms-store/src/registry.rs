// registry.rs — DmsFactory: base path plus one shared handle per workspace.
//
// The factory memoizes handles by name so every caller asking for the same
// workspace sees the same lifecycle state. It is an ordinary value: create as
// many independent factories as needed (tests do), and drop or `clear()` one
// to forget its handles.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use crate::config::StoreConfig;
use crate::error::{DmsError, DmsResult};
use crate::purge::purge_snapshots;
use crate::store::{require_workspace, Workspace};
use crate::text::{Charset, DEFAULT_CHARSET};

/// Hands out [`Workspace`] handles rooted at one base directory.
#[derive(Debug)]
pub struct DmsFactory {
    base_path: PathBuf,
    charset: Charset,
    workspaces: Mutex<HashMap<String, Arc<Workspace>>>,
}

impl DmsFactory {
    /// Create a factory over an existing base directory.
    pub fn new(base_path: impl AsRef<Path>) -> DmsResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            return Err(DmsError::InvalidArgument {
                what: "base path",
                value: base_path.display().to_string(),
            });
        }
        Ok(Self {
            base_path,
            charset: DEFAULT_CHARSET,
            workspaces: Mutex::new(HashMap::new()),
        })
    }

    /// Create a factory from configuration, creating the base path first if
    /// the config allows it.
    pub fn from_config(config: &StoreConfig) -> DmsResult<Self> {
        let charset = config.charset()?;
        if config.create_base_path {
            fs::create_dir_all(&config.base_path)
                .map_err(|source| DmsError::io(&config.base_path, source))?;
        }
        Ok(Self::new(&config.base_path)?.with_charset(charset))
    }

    /// Use `charset` as the default for text operations on handles created
    /// from now on.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// The base directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The handle for `name`, opening (and creating) the workspace on first
    /// use.
    pub fn workspace(&self, name: &str) -> DmsResult<Arc<Workspace>> {
        require_workspace(name)?;
        let mut workspaces = self.lock();
        if let Some(existing) = workspaces.get(name) {
            return Ok(Arc::clone(existing));
        }
        let workspace = Arc::new(Workspace::open(&self.base_path, name, self.charset)?);
        workspaces.insert(name.to_string(), Arc::clone(&workspace));
        tracing::debug!("opened workspace '{}'", name);
        Ok(workspace)
    }

    /// Whether `name` has a live directory under the base path. Never
    /// creates it.
    pub fn workspace_exists(&self, name: &str) -> DmsResult<bool> {
        require_workspace(name)?;
        Ok(self.base_path.join(name).is_dir())
    }

    /// Hard-delete soft-deleted snapshots of `name` without opening the
    /// workspace, so no live directory is created for it.
    pub fn purge_workspace(
        &self,
        name: &str,
        obsolete_before: Option<NaiveDateTime>,
    ) -> DmsResult<usize> {
        require_workspace(name)?;
        purge_snapshots(&self.base_path, name, obsolete_before)
    }

    /// Forget the handle for `name`. Outstanding clones keep working; the
    /// next lookup opens a fresh handle.
    pub fn evict(&self, name: &str) -> Option<Arc<Workspace>> {
        self.lock().remove(name)
    }

    /// Forget every handle.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of memoized handles.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Workspace>>> {
        self.workspaces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
