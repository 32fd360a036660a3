//! Store configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DmsError, DmsResult};
use crate::text::{self, Charset};

/// Store configuration, usually read from `dms.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per workspace.
    pub base_path: PathBuf,

    /// Charset label for text operations that don't name one.
    #[serde(default = "default_charset")]
    pub default_charset: String,

    /// Create `base_path` if it is missing instead of failing.
    #[serde(default)]
    pub create_base_path: bool,
}

fn default_charset() -> String {
    "utf-8".to_string()
}

impl StoreConfig {
    /// A config with defaults for everything but the base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            default_charset: default_charset(),
            create_base_path: false,
        }
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> DmsResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| DmsError::io(path, source))?;
        Ok(toml::from_str(&content)?)
    }

    /// The resolved default charset.
    pub fn charset(&self) -> DmsResult<Charset> {
        text::charset(&self.default_charset)
    }
}
