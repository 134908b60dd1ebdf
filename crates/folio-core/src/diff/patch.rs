//! Application of RFC 6902 operations through `json_patch`.

use serde_json::Value;

use super::model::PatchOp;
use crate::errors::{ExError, ExErrorKind, Result};

fn patch_error(message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("apply_patch")
        .with_message(message)
}

/// Apply `ops` in order to a copy of `document`
///
/// # Errors
///
/// `InvalidInput` when a path does not exist, an index is out of bounds or
/// is not a valid RFC 6901 array index.
pub fn apply_patch(document: &Value, ops: &[PatchOp]) -> Result<Value> {
    let encoded = serde_json::to_value(ops)
        .map_err(|e| patch_error(format!("invalid JSON Patch format: {}", e)))?;
    let patch: json_patch::Patch = serde_json::from_value(encoded)
        .map_err(|e| patch_error(format!("invalid JSON Patch format: {}", e)))?;

    let mut patched = document.clone();
    json_patch::patch(&mut patched, &patch).map_err(|e| patch_error(e.to_string()))?;
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_object_ops() {
        let doc = json!({"a": 1, "b": {"c": 2}});
        let ops = vec![
            PatchOp::Remove { path: "/a".to_string() },
            PatchOp::Replace { path: "/b/c".to_string(), value: json!(3) },
            PatchOp::Add { path: "/d~1e".to_string(), value: json!([]) },
        ];
        assert_eq!(
            apply_patch(&doc, &ops).unwrap(),
            json!({"b": {"c": 3}, "d/e": []})
        );
    }

    #[test]
    fn test_apply_array_ops() {
        let doc = json!([1, 2, 3]);
        let ops = vec![
            PatchOp::Remove { path: "/2".to_string() },
            PatchOp::Add { path: "/-".to_string(), value: json!(9) },
            PatchOp::Add { path: "/0".to_string(), value: json!(0) },
        ];
        assert_eq!(apply_patch(&doc, &ops).unwrap(), json!([0, 1, 2, 9]));
    }

    #[test]
    fn test_missing_path_is_invalid_input() {
        let err = apply_patch(&json!({}), &[PatchOp::Remove { path: "/x".to_string() }]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        let err = apply_patch(&json!([]), &[PatchOp::Replace { path: "/0".to_string(), value: json!(1) }])
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_non_canonical_array_index_rejected() {
        for path in ["/+1", "/01"] {
            let ops = [PatchOp::Replace { path: path.to_string(), value: json!(9) }];
            let err = apply_patch(&json!([1, 2]), &ops).unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::InvalidInput, "path {}", path);
        }
    }

    #[test]
    fn test_failed_patch_leaves_input_untouched() {
        let doc = json!({"a": 1});
        let ops = vec![
            PatchOp::Replace { path: "/a".to_string(), value: json!(2) },
            PatchOp::Remove { path: "/missing".to_string() },
        ];
        assert!(apply_patch(&doc, &ops).is_err());
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn test_root_replace() {
        let out = apply_patch(&json!({"a": 1}), &[PatchOp::Replace { path: String::new(), value: json!(2) }]).unwrap();
        assert_eq!(out, json!(2));
    }
}
