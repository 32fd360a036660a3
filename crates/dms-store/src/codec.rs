// codec.rs — Filename codec for obsolete revisions.
//
// A live document is a file named by its raw key. When it is superseded it is
// renamed in place with a prefix that records why and when:
//
//   _DEL_20241018_142501_093_!@#-invoice.pdf     (removed by delete)
//   _OVR_20241018_142501_093_!@#-invoice.pdf     (replaced by put)
//
// The same prefix is applied to a whole workspace directory when the
// workspace is soft-deleted. Everything after the prefix is the original
// name, which is what key-filtered purges compare against.
//
// Older stores used a single tag (`_DELETED_<ts>_!@#-`). Those names still
// decode, as `Deleted` revisions, so purge can reclaim them; the encoder
// never produces them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// Timestamp layout embedded in tagged names (`yyyyMMdd_HHmmss_SSS`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Constant token separating the timestamp from the original name.
pub const MARKER: &str = "!@#";

/// Length of a two-letter-tag prefix, e.g. `_DEL_20241018_142501_093_!@#-`.
/// Names of this length or shorter are never obsolete.
pub const PREFIX_LEN: usize = "_DEL_yyyyMMdd_HHmmss_SSS_!@#-".len();

static OBSOLETE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^_(DEL|OVR|DELETED)_([0-9]{4})([0-9]{2})([0-9]{2})_([0-9]{2})([0-9]{2})([0-9]{2})_([0-9]{3})_!@#-",
    )
    .expect("obsolete prefix pattern is valid")
});

/// Why a file stopped being live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObsoleteTag {
    /// Removed by `delete` (or a workspace soft-delete).
    Deleted,
    /// Replaced by `put` while updating existing content.
    Overridden,
}

impl ObsoleteTag {
    /// The literal written into the filename prefix.
    pub fn literal(self) -> &'static str {
        match self {
            ObsoleteTag::Deleted => "DEL",
            ObsoleteTag::Overridden => "OVR",
        }
    }
}

impl fmt::Display for ObsoleteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObsoleteTag::Deleted => write!(f, "deleted"),
            ObsoleteTag::Overridden => write!(f, "overridden"),
        }
    }
}

/// A decoded obsolete filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoleteName<'a> {
    pub tag: ObsoleteTag,
    /// Local time of the rename, millisecond precision.
    pub timestamp: NaiveDateTime,
    /// The name the file had while it was live.
    pub original: &'a str,
}

/// Build the tagged name for `original` superseded at `timestamp`.
pub fn encode(tag: ObsoleteTag, timestamp: NaiveDateTime, original: &str) -> String {
    format!(
        "_{}_{}_{}-{}",
        tag.literal(),
        timestamp.format(TIMESTAMP_FORMAT),
        MARKER,
        original
    )
}

/// Decode a filename produced by [`encode`].
///
/// Returns `None` for live names and for anything whose prefix is malformed
/// (wrong shape, impossible date, empty original name).
pub fn decode(name: &str) -> Option<ObsoleteName<'_>> {
    if name.len() <= PREFIX_LEN {
        return None;
    }
    let caps = OBSOLETE_PREFIX.captures(name)?;
    let prefix_end = caps.get(0)?.end();
    let original = &name[prefix_end..];
    if original.is_empty() {
        return None;
    }

    let tag = match &caps[1] {
        "OVR" => ObsoleteTag::Overridden,
        _ => ObsoleteTag::Deleted,
    };

    let field = |i: usize| caps[i].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(caps[2].parse().ok()?, field(3)?, field(4)?)?;
    let timestamp = date.and_hms_milli_opt(field(5)?, field(6)?, field(7)?, field(8)?)?;

    Some(ObsoleteName {
        tag,
        timestamp,
        original,
    })
}

/// True if `name` is a tagged obsolete revision.
pub fn is_obsolete(name: &str) -> bool {
    decode(name).is_some()
}

/// True if `name` is obsolete, its original name equals `original` (when
/// given), and it was superseded strictly before `obsolete_before` (when
/// given).
pub fn matches(
    name: &str,
    original: Option<&str>,
    obsolete_before: Option<NaiveDateTime>,
) -> bool {
    let Some(decoded) = decode(name) else {
        return false;
    };
    if original.is_some_and(|o| o != decoded.original) {
        return false;
    }
    obsolete_before.is_none_or(|cutoff| decoded.timestamp < cutoff)
}

/// The rename target for `path` when it becomes obsolete: a sibling in the
/// same parent directory carrying the tagged name.
///
/// Returns `None` if `path` has no parent or no UTF-8 file name.
pub fn tagged_sibling(path: &Path, tag: ObsoleteTag, timestamp: NaiveDateTime) -> Option<PathBuf> {
    let parent = path.parent()?;
    let name = path.file_name()?.to_str()?;
    Some(parent.join(encode(tag, timestamp, name)))
}
