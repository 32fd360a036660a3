// error.rs — Error types for the document store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum DmsError {
    /// A workspace, directory or key was blank, or the base path is unusable.
    #[error("invalid {what}: '{value}'")]
    InvalidArgument { what: &'static str, value: String },

    /// A path component exists but is a file, not a directory.
    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// `add` was called for a key that already has a live document.
    #[error("document already exists: workspace='{workspace}', directory='{directory}', key='{key}'")]
    AlreadyExists {
        workspace: String,
        directory: String,
        key: String,
    },

    /// No live document exists for the key.
    #[error("document doesn't exist: workspace='{workspace}', directory='{directory}', key='{key}'")]
    NotFound {
        workspace: String,
        directory: String,
        key: String,
    },

    /// The workspace handle was soft-deleted and has not been reset.
    #[error("workspace already deleted: '{0}'")]
    WorkspaceDeleted(String),

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The charset label is not known to `encoding_rs`.
    #[error("unknown charset: '{0}'")]
    UnknownCharset(String),

    /// Text contains characters the target charset cannot represent.
    #[error("text cannot be represented in charset {charset}")]
    Unmappable { charset: &'static str },

    /// Stored bytes are not valid in the requested charset.
    #[error("content is not valid {charset}")]
    InvalidEncoding { charset: &'static str },

    /// A properties document contains a line without `=`.
    #[error("invalid properties line: '{line}'")]
    MalformedProperties { line: String },

    /// The store configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl DmsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DmsError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type DmsResult<T> = Result<T, DmsError>;
