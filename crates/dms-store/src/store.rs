// store.rs — Workspace: keyed documents inside one workspace directory.
//
// Layout: `<base>/<workspace>/<directory>/<key>` holds the live document.
// Superseded revisions sit next to it under a tagged name (see `codec`).
//
// Overwrite protocol (`put` on an existing key):
//   1. rename the live file to `_OVR_<now>_!@#-<key>`
//   2. write the new content at the live path
// The two steps are not atomic. If step 2 fails the key has no live file and
// one extra revision; callers should re-check with `exists`.
//
// No locking is done around check-then-act sequences. Concurrent callers
// targeting the same key must serialize themselves.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDateTime};

use crate::codec::{self, ObsoleteTag};
use crate::error::{DmsError, DmsResult};
use crate::lifecycle::WorkspaceState;
use crate::properties;
use crate::text::{self, Charset};

/// A handle to one workspace.
///
/// Handles are normally obtained from [`DmsFactory`](crate::DmsFactory),
/// which hands out one shared handle per workspace name so that the
/// soft-deleted state is seen by every caller.
#[derive(Debug)]
pub struct Workspace {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    charset: Charset,
    pub(crate) state: Mutex<WorkspaceState>,
}

impl Workspace {
    /// Open the workspace `name` under `base_path`, creating its directory
    /// if it does not exist yet.
    pub fn open(base_path: &Path, name: &str, charset: Charset) -> DmsResult<Self> {
        require_workspace(name)?;
        let path = base_path.join(name);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(DmsError::NotADirectory { path }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&path).map_err(|source| DmsError::io(&path, source))?;
                tracing::debug!("created workspace directory {}", path.display());
            }
            Err(source) => return Err(DmsError::io(path, source)),
        }
        Ok(Self {
            name: name.to_string(),
            path,
            charset,
            state: Mutex::new(WorkspaceState::Active),
        })
    }

    /// The workspace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The workspace root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The charset used by the text operations that don't take one.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Live keys in `directory`, in ascending order.
    ///
    /// Returns an empty list if the directory has never been written to.
    pub fn list_keys(&self, directory: &str) -> DmsResult<Vec<String>> {
        self.ensure_active()?;
        require("directory", directory)?;
        let Some(dir) = self.existing_dir(directory)? else {
            return Ok(Vec::new());
        };

        let entries = fs::read_dir(&dir).map_err(|source| DmsError::io(&dir, source))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DmsError::io(&dir, source))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                tracing::debug!("skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            if !codec::is_obsolete(name) {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Add a new document. Fails with `AlreadyExists` if the key is live.
    pub fn add(&self, directory: &str, key: &str, content: &[u8]) -> DmsResult<()> {
        self.ensure_active()?;
        require("directory", directory)?;
        require_key(key)?;
        let path = self.get_or_create_dir(directory)?.join(key);

        let file = OpenOptions::new().write(true).create_new(true).open(&path);
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(self.already_exists(directory, key));
            }
            Err(source) => return Err(DmsError::io(path, source)),
        };
        file.write_all(content)
            .map_err(|source| DmsError::io(&path, source))?;
        tracing::debug!("added {}", path.display());
        Ok(())
    }

    /// Add a new text document in the workspace charset.
    pub fn add_text(&self, directory: &str, key: &str, content: &str) -> DmsResult<()> {
        self.add_text_with(directory, key, content, self.charset)
    }

    /// Add a new text document in `charset`.
    pub fn add_text_with(
        &self,
        directory: &str,
        key: &str,
        content: &str,
        charset: Charset,
    ) -> DmsResult<()> {
        let bytes = text::encode(content, charset)?;
        self.add(directory, key, &bytes)
    }

    /// Write a document, keeping any previous content as an overridden
    /// revision.
    ///
    /// Returns `true` if the key was not live before, `false` if existing
    /// content was replaced.
    pub fn put(&self, directory: &str, key: &str, content: &[u8]) -> DmsResult<bool> {
        self.ensure_active()?;
        require("directory", directory)?;
        require_key(key)?;
        let path = self.get_or_create_dir(directory)?.join(key);

        let is_new = !path.exists();
        if !is_new {
            retire(&path, ObsoleteTag::Overridden)?;
        }
        fs::write(&path, content).map_err(|source| DmsError::io(&path, source))?;
        tracing::debug!("put {} (new={})", path.display(), is_new);
        Ok(is_new)
    }

    /// [`put`](Self::put) for text in the workspace charset.
    pub fn put_text(&self, directory: &str, key: &str, content: &str) -> DmsResult<bool> {
        self.put_text_with(directory, key, content, self.charset)
    }

    /// [`put`](Self::put) for text in `charset`.
    pub fn put_text_with(
        &self,
        directory: &str,
        key: &str,
        content: &str,
        charset: Charset,
    ) -> DmsResult<bool> {
        let bytes = text::encode(content, charset)?;
        self.put(directory, key, &bytes)
    }

    /// [`put`](Self::put) for a properties map in the workspace charset.
    pub fn put_properties(
        &self,
        directory: &str,
        key: &str,
        content: &BTreeMap<String, String>,
    ) -> DmsResult<bool> {
        self.put_properties_with(directory, key, content, self.charset)
    }

    /// [`put`](Self::put) for a properties map in `charset`.
    pub fn put_properties_with(
        &self,
        directory: &str,
        key: &str,
        content: &BTreeMap<String, String>,
        charset: Charset,
    ) -> DmsResult<bool> {
        self.put_text_with(directory, key, &properties::encode(content), charset)
    }

    /// Whether `key` has a live document in `directory`.
    pub fn exists(&self, directory: &str, key: &str) -> DmsResult<bool> {
        self.ensure_active()?;
        require("directory", directory)?;
        require_key(key)?;
        match self.existing_dir(directory)? {
            Some(dir) => Ok(dir.join(key).exists()),
            None => Ok(false),
        }
    }

    /// Raw content of the live document.
    pub fn get_content(&self, directory: &str, key: &str) -> DmsResult<Vec<u8>> {
        self.ensure_active()?;
        require("directory", directory)?;
        require_key(key)?;
        let path = self.path.join(directory).join(key);
        if !path.exists() {
            return Err(self.not_found(directory, key));
        }
        fs::read(&path).map_err(|source| DmsError::io(path, source))
    }

    /// Text content decoded with the workspace charset.
    pub fn get_text(&self, directory: &str, key: &str) -> DmsResult<String> {
        self.get_text_with(directory, key, self.charset)
    }

    /// Text content decoded with `charset`.
    pub fn get_text_with(&self, directory: &str, key: &str, charset: Charset) -> DmsResult<String> {
        let bytes = self.get_content(directory, key)?;
        text::decode(&bytes, charset)
    }

    /// Text lines decoded with the workspace charset.
    pub fn get_lines(&self, directory: &str, key: &str) -> DmsResult<Vec<String>> {
        self.get_lines_with(directory, key, self.charset)
    }

    /// Text lines decoded with `charset`.
    pub fn get_lines_with(
        &self,
        directory: &str,
        key: &str,
        charset: Charset,
    ) -> DmsResult<Vec<String>> {
        Ok(text::lines(&self.get_text_with(directory, key, charset)?))
    }

    /// Properties map decoded with the workspace charset.
    pub fn get_properties(
        &self,
        directory: &str,
        key: &str,
    ) -> DmsResult<BTreeMap<String, String>> {
        self.get_properties_with(directory, key, self.charset)
    }

    /// Properties map decoded with `charset`.
    pub fn get_properties_with(
        &self,
        directory: &str,
        key: &str,
        charset: Charset,
    ) -> DmsResult<BTreeMap<String, String>> {
        properties::decode(&self.get_text_with(directory, key, charset)?)
    }

    /// Soft-delete a document: the live file becomes a deleted revision.
    pub fn delete(&self, directory: &str, key: &str) -> DmsResult<()> {
        self.ensure_active()?;
        require("directory", directory)?;
        require_key(key)?;
        let path = self.path.join(directory).join(key);
        if !path.exists() {
            return Err(self.not_found(directory, key));
        }
        retire(&path, ObsoleteTag::Deleted)?;
        Ok(())
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, WorkspaceState> {
        // The state is a plain value; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn ensure_active(&self) -> DmsResult<()> {
        match *self.lock_state() {
            WorkspaceState::Active => Ok(()),
            WorkspaceState::Deleted => Err(DmsError::WorkspaceDeleted(self.name.clone())),
        }
    }

    /// Path of `directory` if it exists, `None` if it doesn't.
    pub(crate) fn existing_dir(&self, directory: &str) -> DmsResult<Option<PathBuf>> {
        let path = self.path.join(directory);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(Some(path)),
            Ok(_) => Err(DmsError::NotADirectory { path }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DmsError::io(path, source)),
        }
    }

    fn get_or_create_dir(&self, directory: &str) -> DmsResult<PathBuf> {
        if let Some(dir) = self.existing_dir(directory)? {
            return Ok(dir);
        }
        let path = self.path.join(directory);
        fs::create_dir_all(&path).map_err(|source| DmsError::io(&path, source))?;
        Ok(path)
    }

    fn already_exists(&self, directory: &str, key: &str) -> DmsError {
        DmsError::AlreadyExists {
            workspace: self.name.clone(),
            directory: directory.to_string(),
            key: key.to_string(),
        }
    }

    fn not_found(&self, directory: &str, key: &str) -> DmsError {
        DmsError::NotFound {
            workspace: self.name.clone(),
            directory: directory.to_string(),
            key: key.to_string(),
        }
    }
}

/// Timestamp stamped onto revisions: local wall clock.
pub(crate) fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Rename `path` to its tagged sibling, stamped now.
///
/// An existing file at the target (same key retired twice within one
/// millisecond) is never overwritten; the rename fails instead.
pub(crate) fn retire(path: &Path, tag: ObsoleteTag) -> DmsResult<PathBuf> {
    retire_at(path, tag, local_now())
}

fn retire_at(path: &Path, tag: ObsoleteTag, at: NaiveDateTime) -> DmsResult<PathBuf> {
    let target = codec::tagged_sibling(path, tag, at).ok_or_else(|| {
        DmsError::InvalidArgument {
            what: "path",
            value: path.display().to_string(),
        }
    })?;
    if target.exists() {
        return Err(DmsError::io(
            &target,
            io::Error::new(io::ErrorKind::AlreadyExists, "revision already exists"),
        ));
    }
    fs::rename(path, &target).map_err(|source| DmsError::io(path, source))?;
    tracing::debug!("{} {} -> {}", tag, path.display(), target.display());
    Ok(target)
}

pub(crate) fn require(what: &'static str, value: &str) -> DmsResult<()> {
    if value.trim().is_empty() {
        return Err(DmsError::InvalidArgument {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Workspace names are a single path segment under the base path.
pub(crate) fn require_workspace(name: &str) -> DmsResult<()> {
    require("workspace", name)?;
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DmsError::InvalidArgument {
            what: "workspace",
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Keys must be non-blank and must not look like a tagged revision, which
/// would make the document invisible to listings and eligible for purge.
pub(crate) fn require_key(key: &str) -> DmsResult<()> {
    require("key", key)?;
    if codec::is_obsolete(key) {
        return Err(DmsError::InvalidArgument {
            what: "key",
            value: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const DIR: &str = "some/directory";
    const KEY: &str = "some_key";

    fn open_workspace() -> (TempDir, Workspace) {
        let base = tempdir().unwrap();
        let ws = Workspace::open(base.path(), "ws", text::DEFAULT_CHARSET).unwrap();
        (base, ws)
    }

    /// Revisions of one key are stamped with millisecond precision.
    fn tick() {
        thread::sleep(Duration::from_millis(5));
    }

    fn obsolete_names(ws: &Workspace) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(ws.path().join(DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| codec::is_obsolete(n))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn open_creates_workspace_directory() {
        let base = tempdir().unwrap();
        let ws = Workspace::open(base.path(), "fresh", text::DEFAULT_CHARSET).unwrap();
        assert!(ws.path().is_dir());
        assert_eq!(ws.name(), "fresh");
    }

    #[test]
    fn open_rejects_blank_name_and_file_collision() {
        let base = tempdir().unwrap();
        assert!(matches!(
            Workspace::open(base.path(), "  ", text::DEFAULT_CHARSET),
            Err(DmsError::InvalidArgument { what: "workspace", .. })
        ));

        fs::write(base.path().join("taken"), b"x").unwrap();
        assert!(matches!(
            Workspace::open(base.path(), "taken", text::DEFAULT_CHARSET),
            Err(DmsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn open_rejects_names_that_are_not_one_segment() {
        let base = tempdir().unwrap();
        for name in ["a/b", "a\\b", ".", "..", "../escape"] {
            assert!(
                matches!(
                    Workspace::open(base.path(), name, text::DEFAULT_CHARSET),
                    Err(DmsError::InvalidArgument { what: "workspace", .. })
                ),
                "{name}"
            );
        }
        assert_eq!(fs::read_dir(base.path()).unwrap().count(), 0);
        assert!(Workspace::open(base.path(), "a.b", text::DEFAULT_CHARSET).is_ok());
    }

    #[test]
    fn list_keys_of_unwritten_directory_is_empty() {
        let (_base, ws) = open_workspace();
        assert!(ws.list_keys(DIR).unwrap().is_empty());
    }

    #[test]
    fn list_keys_is_sorted_and_skips_revisions() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, "b", "2").unwrap();
        ws.add_text(DIR, "a", "1").unwrap();
        ws.add_text(DIR, "c", "3").unwrap();
        ws.put_text(DIR, "a", "1b").unwrap();
        ws.delete(DIR, "c").unwrap();

        assert_eq!(ws.list_keys(DIR).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn list_keys_on_file_is_not_a_directory() {
        let (_base, ws) = open_workspace();
        ws.add_text("docs", "plain", "x").unwrap();
        assert!(matches!(
            ws.list_keys("docs/plain"),
            Err(DmsError::NotADirectory { .. })
        ));
        assert!(matches!(
            ws.exists("docs/plain", "k"),
            Err(DmsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn blank_arguments_are_rejected() {
        let (_base, ws) = open_workspace();
        assert!(matches!(
            ws.add_text("", KEY, "x"),
            Err(DmsError::InvalidArgument { what: "directory", .. })
        ));
        assert!(matches!(
            ws.put_text(DIR, " ", "x"),
            Err(DmsError::InvalidArgument { what: "key", .. })
        ));
        assert!(matches!(
            ws.list_keys("\t"),
            Err(DmsError::InvalidArgument { .. })
        ));
        // Nothing was created on disk.
        assert!(!ws.path().join(DIR).exists());
    }

    #[test]
    fn keys_shaped_like_revisions_are_rejected() {
        let (_base, ws) = open_workspace();
        let err = ws
            .add_text(DIR, "_DEL_20240101_000000_000_!@#-x", "x")
            .unwrap_err();
        assert!(matches!(err, DmsError::InvalidArgument { what: "key", .. }));
    }

    #[test]
    fn add_then_get_round_trips() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, KEY, "some_value").unwrap();

        assert_eq!(ws.list_keys(DIR).unwrap(), vec![KEY]);
        assert!(ws.exists(DIR, KEY).unwrap());
        assert_eq!(ws.get_text(DIR, KEY).unwrap(), "some_value");
    }

    #[test]
    fn add_round_trips_empty_and_binary_content() {
        let (_base, ws) = open_workspace();
        ws.add(DIR, "empty", &[]).unwrap();
        ws.add(DIR, "bin", &[0, 159, 146, 150, 255]).unwrap();

        assert!(ws.get_content(DIR, "empty").unwrap().is_empty());
        assert_eq!(ws.get_content(DIR, "bin").unwrap(), vec![0, 159, 146, 150, 255]);
    }

    #[test]
    fn add_round_trips_text_in_other_charsets() {
        let (_base, ws) = open_workspace();
        let latin2 = text::charset("windows-1250").unwrap();
        ws.add_text_with(DIR, KEY, "Žluťoučký kůň", latin2).unwrap();

        assert_eq!(ws.get_text_with(DIR, KEY, latin2).unwrap(), "Žluťoučký kůň");
        assert!(matches!(
            ws.get_text(DIR, KEY),
            Err(DmsError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn add_duplicate_fails_and_keeps_first_content() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, KEY, "some_value1").unwrap();

        let err = ws.add_text(DIR, KEY, "some_value2").unwrap_err();
        assert!(matches!(err, DmsError::AlreadyExists { ref key, .. } if key == KEY));
        assert_eq!(ws.get_text(DIR, KEY).unwrap(), "some_value1");
        assert!(obsolete_names(&ws).is_empty());
    }

    #[test]
    fn put_reports_new_only_on_first_write() {
        let (_base, ws) = open_workspace();
        assert!(ws.put_text(DIR, KEY, "v1").unwrap());
        tick();
        assert!(!ws.put_text(DIR, KEY, "v2").unwrap());
        tick();
        assert!(!ws.put_text(DIR, KEY, "v3").unwrap());

        assert_eq!(ws.get_text(DIR, KEY).unwrap(), "v3");
        let revisions = obsolete_names(&ws);
        assert_eq!(revisions.len(), 2);
        assert!(revisions.iter().all(|n| n.starts_with("_OVR_")));
    }

    #[test]
    fn put_keeps_previous_content_in_revision() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, KEY, "v1").unwrap();
        ws.put_text(DIR, KEY, "v2").unwrap();

        let revisions = obsolete_names(&ws);
        assert_eq!(revisions.len(), 1);
        let decoded = codec::decode(&revisions[0]).unwrap();
        assert_eq!(decoded.tag, ObsoleteTag::Overridden);
        assert_eq!(decoded.original, KEY);
        let old = fs::read_to_string(ws.path().join(DIR).join(&revisions[0])).unwrap();
        assert_eq!(old, "v1");
    }

    #[test]
    fn put_after_delete_is_new_again() {
        let (_base, ws) = open_workspace();
        assert!(ws.put_text(DIR, KEY, "v").unwrap());
        tick();
        assert!(!ws.put_text(DIR, KEY, "v").unwrap());
        ws.delete(DIR, KEY).unwrap();
        assert!(ws.put_text(DIR, KEY, "v").unwrap());
    }

    #[test]
    fn properties_round_trip_through_put() {
        let (_base, ws) = open_workspace();
        let key = "tmp_test.properties";

        let empty = BTreeMap::new();
        assert!(ws.put_properties(DIR, key, &empty).unwrap());
        assert!(ws.get_properties(DIR, key).unwrap().is_empty());

        let mut props = BTreeMap::new();
        props.insert("A".to_string(), "2024-10-18T10:00:00".to_string());
        props.insert("B".to_string(), "1234+ľščščťžŤŘČÁĚ".to_string());
        tick();
        assert!(!ws.put_properties(DIR, key, &props).unwrap());
        assert_eq!(ws.get_properties(DIR, key).unwrap(), props);
    }

    #[test]
    fn get_lines_splits_content() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, KEY, "first\r\nsecond\nthird\n").unwrap();
        assert_eq!(
            ws.get_lines(DIR, KEY).unwrap(),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn delete_hides_document() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, KEY, "some_value").unwrap();
        ws.delete(DIR, KEY).unwrap();

        assert!(!ws.exists(DIR, KEY).unwrap());
        assert!(ws.list_keys(DIR).unwrap().is_empty());
        assert!(matches!(
            ws.get_text(DIR, KEY),
            Err(DmsError::NotFound { .. })
        ));
        assert!(matches!(ws.delete(DIR, KEY), Err(DmsError::NotFound { .. })));

        let revisions = obsolete_names(&ws);
        assert_eq!(revisions.len(), 1);
        assert!(revisions[0].starts_with("_DEL_"));
    }

    #[test]
    fn get_and_delete_missing_key_are_not_found() {
        let (_base, ws) = open_workspace();
        assert!(matches!(
            ws.get_content("nowhere", KEY),
            Err(DmsError::NotFound { .. })
        ));
        assert!(matches!(
            ws.delete("nowhere", KEY),
            Err(DmsError::NotFound { .. })
        ));
        assert!(!ws.exists("nowhere", KEY).unwrap());
    }

    #[test]
    fn retire_refuses_to_overwrite_existing_revision() {
        let (_base, ws) = open_workspace();
        ws.add_text(DIR, KEY, "v1").unwrap();
        let path = ws.path().join(DIR).join(KEY);

        let at = local_now();
        let taken = ws.path().join(DIR).join(codec::encode(ObsoleteTag::Deleted, at, KEY));
        fs::write(&taken, b"earlier").unwrap();

        let err = retire_at(&path, ObsoleteTag::Deleted, at).unwrap_err();
        assert!(matches!(err, DmsError::Io { ref source, .. } if source.kind() == io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read_to_string(&path).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&taken).unwrap(), "earlier");
    }
}
