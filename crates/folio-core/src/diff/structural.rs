//! Structural walk shared by the JSON-Patch and summary formats.
//!
//! Objects are compared key by key. Arrays are compared position by
//! position with no move detection, so a reordered array shows up as a run
//! of `replace` operations.

use serde_json::Value;

use super::model::{DiffEntry, DiffSummary, PatchOp};

#[derive(Debug, Clone, PartialEq)]
enum Change {
    Added { path: String, value: Value },
    Removed { path: String, old: Value },
    Changed { path: String, old: Value, new: Value },
}

/// Escape one JSON-Pointer reference token
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn walk(old: &Value, new: &Value, path: &str, out: &mut Vec<Change>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            // op order must not depend on map iteration order
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{}/{}", path, escape_token(key));
                match (a.get(key.as_str()), b.get(key.as_str())) {
                    (Some(x), Some(y)) => walk(x, y, &child, out),
                    (Some(x), None) => out.push(Change::Removed {
                        path: child,
                        old: x.clone(),
                    }),
                    (None, Some(y)) => out.push(Change::Added {
                        path: child,
                        value: y.clone(),
                    }),
                    (None, None) => {}
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let common = a.len().min(b.len());
            for i in 0..common {
                walk(&a[i], &b[i], &format!("{}/{}", path, i), out);
            }
            for (i, value) in b.iter().enumerate().skip(common) {
                out.push(Change::Added {
                    path: format!("{}/{}", path, i),
                    value: value.clone(),
                });
            }
            // highest index first so the ops apply in sequence
            for i in (common..a.len()).rev() {
                out.push(Change::Removed {
                    path: format!("{}/{}", path, i),
                    old: a[i].clone(),
                });
            }
        }
        _ if old == new => {}
        _ => out.push(Change::Changed {
            path: path.to_string(),
            old: old.clone(),
            new: new.clone(),
        }),
    }
}

fn changes(old: &Value, new: &Value) -> Vec<Change> {
    let mut out = Vec::new();
    walk(old, new, "", &mut out);
    out
}

/// RFC 6902 operations turning `old` into `new`
pub fn json_patch(old: &Value, new: &Value) -> Vec<PatchOp> {
    changes(old, new)
        .into_iter()
        .map(|change| match change {
            Change::Added { path, value } => PatchOp::Add { path, value },
            Change::Removed { path, .. } => PatchOp::Remove { path },
            Change::Changed { path, new, .. } => PatchOp::Replace { path, value: new },
        })
        .collect()
}

/// The same differences as [`json_patch`], grouped by kind
pub fn summary(old: &Value, new: &Value) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for change in changes(old, new) {
        match change {
            Change::Added { path, value } => summary.additions.push(DiffEntry {
                path,
                old_value: None,
                new_value: Some(value),
            }),
            Change::Removed { path, old } => summary.removals.push(DiffEntry {
                path,
                old_value: Some(old),
                new_value: None,
            }),
            Change::Changed { path, old, new } => summary.changes.push(DiffEntry {
                path,
                old_value: Some(old),
                new_value: Some(new),
            }),
        }
    }
    summary
}
