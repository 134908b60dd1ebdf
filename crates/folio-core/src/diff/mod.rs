//! Version comparison.
//!
//! Both sides are normalized first, so documents that differ only in key
//! order or whitespace compare equal in every format. The text formats
//! (`unified`, `side_by_side`) diff the normalized serializations line by
//! line; the structural formats (`json_patch`, `summary`) walk the
//! canonical values.

pub mod human_summary;
pub mod model;
pub mod patch;
pub mod structural;
pub mod text;

use serde_json::Value;

use crate::errors::Result;
use crate::model::Document;
use crate::normalize::{canonicalize, normalize};

pub use human_summary::render_human_summary;
pub use model::{
    DiffEntry, DiffFormat, DiffHunk, DiffLine, DiffResult, DiffSummary, PatchOp, RowKind,
    Segment, SideBySideRow, SideCell,
};
pub use patch::apply_patch;

/// Line diff of the normalized serializations
pub fn unified_diff(old: &Value, new: &Value) -> Result<Vec<DiffHunk>> {
    Ok(text::unified_hunks(&normalize(old)?, &normalize(new)?))
}

/// Paired rows of the normalized serializations
pub fn side_by_side_diff(old: &Value, new: &Value) -> Result<Vec<SideBySideRow>> {
    Ok(text::side_by_side_rows(&normalize(old)?, &normalize(new)?))
}

/// RFC 6902 ops turning `old` into `new`
pub fn json_patch(old: &Value, new: &Value) -> Vec<PatchOp> {
    structural::json_patch(&canonicalize(old), &canonicalize(new))
}

pub fn summary(old: &Value, new: &Value) -> DiffSummary {
    structural::summary(&canonicalize(old), &canonicalize(new))
}

/// Compare two JSON values in the requested format
pub fn diff_values(old: &Value, new: &Value, format: DiffFormat) -> Result<DiffResult> {
    Ok(match format {
        DiffFormat::Unified => DiffResult::Unified {
            hunks: unified_diff(old, new)?,
        },
        DiffFormat::SideBySide => DiffResult::SideBySide {
            rows: side_by_side_diff(old, new)?,
        },
        DiffFormat::JsonPatch => DiffResult::JsonPatch {
            ops: json_patch(old, new),
        },
        DiffFormat::Summary => DiffResult::Summary(summary(old, new)),
    })
}

/// Compare two documents in their stored snapshot shape
pub fn diff_documents(old: &Document, new: &Document, format: DiffFormat) -> Result<DiffResult> {
    diff_values(&old.to_snapshot_value()?, &new.to_snapshot_value()?, format)
}
