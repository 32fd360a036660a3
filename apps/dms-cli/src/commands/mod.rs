// Command implementations for the dms CLI.

pub mod document;
pub mod workspace;

use std::path::Path;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveDateTime};
use dms_store::StoreConfig;

/// Name of the config file picked up from the current directory.
const DEFAULT_CONFIG_FILE: &str = "dms.toml";

/// Build the store config from the command-line flags.
///
/// `--base-path` wins over the config file's `base_path`. Without either
/// flag, `./dms.toml` is used if present.
pub fn resolve_config(
    config: Option<&Path>,
    base_path: Option<&Path>,
) -> anyhow::Result<StoreConfig> {
    let from_file = match config {
        Some(path) => Some(
            StoreConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
        ),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            Some(StoreConfig::load(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => None,
    };

    match (from_file, base_path) {
        (Some(mut config), Some(base)) => {
            config.base_path = base.to_path_buf();
            Ok(config)
        }
        (Some(config), None) => Ok(config),
        (None, Some(base)) => Ok(StoreConfig::new(base)),
        (None, None) => bail!("no base path: pass --base-path or --config"),
    }
}

/// Parse a purge cutoff: `now`, `YYYY-MM-DD`, or `YYYY-MM-DDTHH:MM:SS[.fff]`
/// in local time.
pub fn parse_cutoff(value: &str) -> Result<NaiveDateTime, String> {
    if value.eq_ignore_ascii_case("now") {
        return Ok(Local::now().naive_local());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(at);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid time '{value}': expected now, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn parse_cutoff_accepts_supported_forms() {
        let at = parse_cutoff("2024-10-18T09:30:15.250").unwrap();
        assert_eq!(at.to_string(), "2024-10-18 09:30:15.250");

        let at = parse_cutoff("2024-10-18T09:30:15").unwrap();
        assert_eq!(at.to_string(), "2024-10-18 09:30:15");

        let at = parse_cutoff("2024-10-18").unwrap();
        assert_eq!(at.to_string(), "2024-10-18 00:00:00");

        let before = Local::now().naive_local();
        assert!(parse_cutoff("NOW").unwrap() >= before);
    }

    #[test]
    fn parse_cutoff_rejects_garbage() {
        assert!(parse_cutoff("yesterday").is_err());
        assert!(parse_cutoff("2024-13-01").is_err());
    }

    #[test]
    fn base_path_flag_overrides_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("dms.toml");
        fs::write(&config_path, "base_path = \"/from/file\"\ndefault_charset = \"windows-1250\"\n")
            .unwrap();

        let config = resolve_config(Some(&config_path), None).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/from/file"));

        let config = resolve_config(Some(&config_path), Some(Path::new("/from/flag"))).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/from/flag"));
        assert_eq!(config.default_charset, "windows-1250");
    }

    #[test]
    fn base_path_flag_alone_is_enough() {
        let config = resolve_config(None, Some(Path::new("/data"))).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/data"));
        assert_eq!(config.default_charset, "utf-8");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(resolve_config(Some(&dir.path().join("none.toml")), None).is_err());
    }
}
