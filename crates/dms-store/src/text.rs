// text.rs — Charset-aware text over document bytes.
//
// Documents are stored as raw bytes; text reads and writes pass through an
// `encoding_rs` charset. UTF-8 is the default everywhere.

use encoding_rs::{Encoding, UTF_8};

use crate::error::{DmsError, DmsResult};

/// A charset usable for document text.
pub type Charset = &'static Encoding;

/// The charset used when none is given.
pub const DEFAULT_CHARSET: Charset = UTF_8;

/// Resolve a charset label such as `"utf-8"`, `"iso-8859-1"` or
/// `"windows-1250"`.
pub fn charset(label: &str) -> DmsResult<Charset> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| DmsError::UnknownCharset(label.to_string()))
}

/// Encode text for storage.
///
/// Fails if the charset cannot represent the text. UTF-16 charsets are
/// rejected because `encoding_rs` only decodes them.
pub fn encode(text: &str, charset: Charset) -> DmsResult<Vec<u8>> {
    if charset.output_encoding() != charset {
        return Err(DmsError::Unmappable {
            charset: charset.name(),
        });
    }
    let (bytes, _, had_errors) = charset.encode(text);
    if had_errors {
        return Err(DmsError::Unmappable {
            charset: charset.name(),
        });
    }
    Ok(bytes.into_owned())
}

/// Decode stored bytes as text. A leading BOM is not stripped.
pub fn decode(bytes: &[u8], charset: Charset) -> DmsResult<String> {
    let (text, had_errors) = charset.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DmsError::InvalidEncoding {
            charset: charset.name(),
        });
    }
    Ok(text.into_owned())
}

/// Split text into lines on `\n`, `\r\n` or `\r`. A trailing line
/// terminator does not produce an empty last line.
pub fn lines(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => out.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
