// document.rs — Document subcommands: keys, add, put, get, lines, exists, delete, purge.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::Subcommand;
use dms_store::{text, Charset, Workspace};

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// List the live keys in a directory.
    Keys {
        /// Directory inside the workspace (e.g., "2024/10").
        directory: String,
    },
    /// Create a document. Fails if the key already exists.
    Add {
        directory: String,
        key: String,
        /// Text content. Reads stdin when neither this nor --file is given.
        content: Option<String>,
        /// Take the raw content from this file instead.
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Charset used to encode text content (defaults to the store's).
        #[arg(long)]
        charset: Option<String>,
    },
    /// Create or overwrite a document, keeping the old content as a revision.
    Put {
        directory: String,
        key: String,
        /// Text content. Reads stdin when neither this nor --file is given.
        content: Option<String>,
        /// Take the raw content from this file instead.
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Charset used to encode text content (defaults to the store's).
        #[arg(long)]
        charset: Option<String>,
    },
    /// Print a document's raw content.
    Get { directory: String, key: String },
    /// Print a document line by line, decoded with a charset.
    Lines {
        directory: String,
        key: String,
        /// Charset used to decode the content (defaults to the store's).
        #[arg(long)]
        charset: Option<String>,
    },
    /// Print whether a live document exists.
    Exists { directory: String, key: String },
    /// Soft-delete a document.
    Delete { directory: String, key: String },
    /// Permanently remove deleted and overridden revisions in a directory.
    Purge {
        directory: String,
        /// Only revisions of this key.
        #[arg(long)]
        key: Option<String>,
        /// Only revisions made strictly before this time
        /// ("now", YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS[.fff], local time).
        #[arg(long, value_parser = super::parse_cutoff)]
        before: Option<NaiveDateTime>,
    },
}

pub fn execute(cmd: &DocumentCommands, ws: &Workspace, out: &mut impl Write) -> anyhow::Result<()> {
    match cmd {
        DocumentCommands::Keys { directory } => {
            for key in ws.list_keys(directory)? {
                writeln!(out, "{}", key)?;
            }
            Ok(())
        }
        DocumentCommands::Add {
            directory,
            key,
            content,
            file,
            charset,
        } => {
            let bytes = content_bytes(ws, content.as_deref(), file.as_deref(), charset.as_deref())?;
            ws.add(directory, key, &bytes)?;
            writeln!(out, "Added {}/{} ({} bytes)", directory, key, bytes.len())?;
            Ok(())
        }
        DocumentCommands::Put {
            directory,
            key,
            content,
            file,
            charset,
        } => {
            let bytes = content_bytes(ws, content.as_deref(), file.as_deref(), charset.as_deref())?;
            let created = ws.put(directory, key, &bytes)?;
            let verb = if created { "Created" } else { "Replaced" };
            writeln!(out, "{} {}/{} ({} bytes)", verb, directory, key, bytes.len())?;
            Ok(())
        }
        DocumentCommands::Get { directory, key } => {
            out.write_all(&ws.get_content(directory, key)?)?;
            out.flush()?;
            Ok(())
        }
        DocumentCommands::Lines {
            directory,
            key,
            charset,
        } => {
            let charset = resolve_charset(ws, charset.as_deref())?;
            for line in ws.get_lines_with(directory, key, charset)? {
                writeln!(out, "{}", line)?;
            }
            Ok(())
        }
        DocumentCommands::Exists { directory, key } => {
            writeln!(out, "{}", ws.exists(directory, key)?)?;
            Ok(())
        }
        DocumentCommands::Delete { directory, key } => {
            ws.delete(directory, key)?;
            writeln!(out, "Deleted {}/{}", directory, key)?;
            Ok(())
        }
        DocumentCommands::Purge {
            directory,
            key,
            before,
        } => {
            let removed = ws.purge(directory, key.as_deref(), *before)?;
            writeln!(out, "Purged {} revision(s) from {}", removed, directory)?;
            Ok(())
        }
    }
}

fn resolve_charset(ws: &Workspace, label: Option<&str>) -> anyhow::Result<Charset> {
    match label {
        Some(label) => Ok(text::charset(label)?),
        None => Ok(ws.charset()),
    }
}

/// Bytes to store: inline text encoded with the charset, a file's raw
/// bytes, or stdin.
fn content_bytes(
    ws: &Workspace,
    content: Option<&str>,
    file: Option<&Path>,
    charset: Option<&str>,
) -> anyhow::Result<Vec<u8>> {
    if let Some(content) = content {
        let charset = resolve_charset(ws, charset)?;
        return Ok(text::encode(content, charset)?);
    }
    if let Some(file) = file {
        return std::fs::read(file).with_context(|| format!("failed to read {}", file.display()));
    }
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .context("failed to read content from stdin")?;
    Ok(bytes)
}
