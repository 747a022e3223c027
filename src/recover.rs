//! Recursive recovery of nested JSON script payloads
//!
//! Script documents arrive as JSON that encodes further JSON documents as
//! string values, nested to arbitrary depth under the `script` field. The
//! engine walks the parsed tree and replaces every string that is itself a
//! valid JSON encoding with its parsed structure. Strings that fail to parse
//! stay untouched; that is the normal terminal case for a leaf script body,
//! not an error.

use serde_json::Value;

use crate::error::Error;
use crate::sanitize::sanitize;

/// Field name whose string values are treated as nested encoded documents.
pub const SCRIPT_KEY: &str = "script";

/// How unwrap candidates are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnwrapMode {
    /// Only string values directly under a `"script"` mapping key.
    #[default]
    KeyOnly,
    /// Additionally, any string whose raw text contains the substring
    /// `"script"` (quotes included). Used by the page-extraction path, where
    /// the field boundary is not guaranteed to align with a mapping key —
    /// the candidate can be the outer document itself. False positives that
    /// fail to parse are left untouched, so this only ever adds coverage.
    KeyOrSubstring,
}

impl UnwrapMode {
    fn substring_enabled(self) -> bool {
        self == UnwrapMode::KeyOrSubstring
    }
}

/// Sanitize `raw`, parse it as JSON and recover nested script payloads.
///
/// Failure of the outermost parse is the one fatal case; no partial
/// document is returned.
pub fn recover_text(raw: &str, mode: UnwrapMode) -> Result<Value, Error> {
    let root: Value = serde_json::from_str(&sanitize(raw))?;
    Ok(recover(root, mode))
}

/// Rewrite a parsed tree, replacing encoded script strings with their
/// parsed structure, recursively.
///
/// Sequence order, mapping key sets and key insertion order are preserved.
/// Null, boolean and number nodes pass through unchanged.
pub fn recover(root: Value, mode: UnwrapMode) -> Value {
    match root {
        Value::String(s) if mode.substring_enabled() && looks_like_script(&s) => {
            try_unwrap(s, mode)
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| recover(v, mode)).collect())
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                let value = match value {
                    Value::String(s) if key == SCRIPT_KEY => try_unwrap(s, mode),
                    Value::String(s) if mode.substring_enabled() && looks_like_script(&s) => {
                        try_unwrap(s, mode)
                    }
                    other => recover(other, mode),
                };
                out.insert(key, value);
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn looks_like_script(s: &str) -> bool {
    s.contains("\"script\"")
}

/// Parse a candidate string as JSON. On success the parsed tree is itself
/// recovered to catch further nesting; on failure the original string is
/// kept as-is.
fn try_unwrap(s: String, mode: UnwrapMode) -> Value {
    match serde_json::from_str::<Value>(&sanitize(&s)) {
        // A candidate that parses back to the identical string is accepted
        // once and not re-examined, so the engine cannot loop.
        Ok(Value::String(inner)) if inner == s => Value::String(inner),
        Ok(parsed) => recover(parsed, mode),
        Err(_) => Value::String(s),
    }
}
