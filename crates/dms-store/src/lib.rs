//! # dms-store
//!
//! Versioned soft-delete document store on a plain filesystem.
//!
//! Documents are addressed by `(workspace, directory, key)` and live at
//! `<base>/<workspace>/<directory>/<key>`. Nothing is deleted in place:
//! `delete` and overwriting `put` rename the live file to a timestamp-tagged
//! sibling, and only an explicit purge removes those revisions for good.
//!
//! ## Key components
//!
//! - [`DmsFactory`] — base path plus one memoized [`Workspace`] per name.
//! - [`Workspace`] — add/put/exists/get/delete/list over one workspace, with
//!   text, line and properties variants over the same bytes.
//! - [`codec`] — the filename encoding that marks revisions as deleted or
//!   overridden and records when.
//! - Purge — [`Workspace::purge`] for revisions in a directory,
//!   [`Workspace::purge_workspace`] for soft-deleted workspace snapshots.
//! - Lifecycle — [`Workspace::delete_workspace`] and
//!   [`Workspace::reset_workspace`], tracked by [`WorkspaceState`].
//!
//! ```no_run
//! use dms_store::DmsFactory;
//!
//! # fn main() -> Result<(), dms_store::DmsError> {
//! let factory = DmsFactory::new("/var/lib/dms")?;
//! let ws = factory.workspace("invoices")?;
//! ws.put_text("2024/10", "acme.txt", "total=42")?;
//! ws.delete("2024/10", "acme.txt")?;
//! let removed = ws.purge("2024/10", Some("acme.txt"), None)?;
//! assert_eq!(removed, 1);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod properties;
mod purge;
pub mod registry;
pub mod store;
pub mod text;

pub use codec::{ObsoleteName, ObsoleteTag};
pub use config::StoreConfig;
pub use error::{DmsError, DmsResult};
pub use lifecycle::WorkspaceState;
pub use registry::DmsFactory;
pub use store::Workspace;
pub use text::{Charset, DEFAULT_CHARSET};
