// properties.rs — `key=value` properties documents.
//
// One pair per line, no escaping. On read, lines starting with `#` and blank
// lines are skipped and the first `=` splits key from value.

use std::collections::BTreeMap;

use crate::error::{DmsError, DmsResult};

/// Render a properties map, one `key=value` line per entry.
pub fn encode(properties: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in properties {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Parse a properties document.
pub fn decode(text: &str) -> DmsResult<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();
    for line in text.lines() {
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(DmsError::MalformedProperties {
                line: line.to_string(),
            });
        };
        properties.insert(key.to_string(), value.to_string());
    }
    Ok(properties)
}
