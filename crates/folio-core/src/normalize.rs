//! Deterministic canonicalization of JSON documents.
//!
//! Every comparison between two documents (diffs, content digests) goes
//! through [`normalize`], so two documents that differ only in key order or
//! formatting produce identical text.
//!
//! ## Rules
//!
//! - Object keys are sorted by byte order at every depth
//! - Array element order is preserved
//! - `\r\n` inside string values becomes `\n`
//! - Output is 2-space indented with one trailing newline
//!
//! The writer sorts keys itself instead of relying on `serde_json::Map`
//! ordering, which changes when any crate in the build enables
//! `preserve_order`.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::Document;

const INDENT: &str = "  ";

/// Canonical copy of `value` (sorted keys, normalized line endings)
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for key in keys {
                out.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::String(s) => Value::String(normalize_line_endings(s)),
        other => other.clone(),
    }
}

/// Serialize `value` to its canonical text form
pub fn normalize(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(value, 0, &mut out)?;
    out.push('\n');
    Ok(out)
}

/// Parse JSON text and return its canonical text form
///
/// # Errors
///
/// - `InvalidDocument` if `json` is not valid JSON
pub fn normalize_str(json: &str) -> Result<String> {
    let value: Value = serde_json::from_str(json).map_err(|e| {
        ExError::new(ExErrorKind::InvalidDocument)
            .with_op("normalize_str")
            .with_message(format!("document is not valid JSON: {}", e))
    })?;
    normalize(&value)
}

/// Canonical text of a document in its stored snapshot shape
pub fn normalize_document(document: &Document) -> Result<String> {
    normalize(&document.to_snapshot_value()?)
}

/// Hex SHA-256 of the canonical text of `value`
pub fn content_digest(value: &Value) -> Result<String> {
    let canonical = normalize(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn normalize_line_endings(s: &str) -> String {
    if s.contains('\r') {
        s.replace("\r\n", "\n")
    } else {
        s.to_string()
    }
}

fn write_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_string(s: &str, out: &mut String) -> Result<()> {
    let escaped = serde_json::to_string(&normalize_line_endings(s)).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("normalize")
            .with_message(e.to_string())
    })?;
    out.push_str(&escaped);
    Ok(())
}

fn write_value(value: &Value, depth: usize, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return Ok(());
            }
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                write_indent(depth + 1, out);
                write_value(item, depth + 1, out)?;
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            write_indent(depth, out);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return Ok(());
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push_str("{\n");
            for (i, key) in keys.iter().enumerate() {
                write_indent(depth + 1, out);
                write_string(key, out)?;
                out.push_str(": ");
                write_value(&map[key.as_str()], depth + 1, out)?;
                if i + 1 < keys.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            write_indent(depth, out);
            out.push('}');
        }
    }
    Ok(())
}
