use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ExError, ExErrorKind};

/// Output format of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffFormat {
    Unified,
    SideBySide,
    JsonPatch,
    Summary,
}

impl DiffFormat {
    pub const ALL: [DiffFormat; 4] = [
        DiffFormat::Unified,
        DiffFormat::SideBySide,
        DiffFormat::JsonPatch,
        DiffFormat::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiffFormat::Unified => "unified",
            DiffFormat::SideBySide => "side_by_side",
            DiffFormat::JsonPatch => "json_patch",
            DiffFormat::Summary => "summary",
        }
    }
}

impl fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffFormat {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiffFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                ExError::new(ExErrorKind::InvalidDiffFormat)
                    .with_op("parse_diff_format")
                    .with_message(format!(
                        "unknown diff format '{}', expected one of unified, side_by_side, json_patch, summary",
                        s
                    ))
            })
    }
}

/// A contiguous region of changes with surrounding context lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// 1-based
    pub old_start: usize,
    pub old_count: usize,
    /// 1-based
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Equal,
    Changed,
    Added,
    Removed,
}

/// A run of text within a side-by-side cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// True when this run differs from the other side
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideCell {
    /// 1-based
    pub line_number: usize,
    pub text: String,
    pub segments: Vec<Segment>,
}

/// One row of a side-by-side diff. `left` is absent for added lines and
/// `right` for removed lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideBySideRow {
    pub kind: RowKind,
    pub left: Option<SideCell>,
    pub right: Option<SideCell>,
}

/// RFC 6902 operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }
}

/// One structural difference at a JSON-Pointer path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Structural differences grouped by kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub additions: Vec<DiffEntry>,
    pub removals: Vec<DiffEntry>,
    pub changes: Vec<DiffEntry>,
}

impl DiffSummary {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty() && self.changes.is_empty()
    }

    pub fn total(&self) -> usize {
        self.additions.len() + self.removals.len() + self.changes.len()
    }
}

/// Result of a comparison, tagged by format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DiffResult {
    Unified { hunks: Vec<DiffHunk> },
    SideBySide { rows: Vec<SideBySideRow> },
    JsonPatch { ops: Vec<PatchOp> },
    Summary(DiffSummary),
}

impl DiffResult {
    pub fn format(&self) -> DiffFormat {
        match self {
            DiffResult::Unified { .. } => DiffFormat::Unified,
            DiffResult::SideBySide { .. } => DiffFormat::SideBySide,
            DiffResult::JsonPatch { .. } => DiffFormat::JsonPatch,
            DiffResult::Summary(_) => DiffFormat::Summary,
        }
    }

    /// Result of comparing two identical documents
    pub fn empty(format: DiffFormat) -> Self {
        match format {
            DiffFormat::Unified => DiffResult::Unified { hunks: Vec::new() },
            DiffFormat::SideBySide => DiffResult::SideBySide { rows: Vec::new() },
            DiffFormat::JsonPatch => DiffResult::JsonPatch { ops: Vec::new() },
            DiffFormat::Summary => DiffResult::Summary(DiffSummary::default()),
        }
    }

    /// True when the result reports no difference
    pub fn is_empty(&self) -> bool {
        match self {
            DiffResult::Unified { hunks } => hunks.is_empty(),
            DiffResult::SideBySide { rows } => rows.iter().all(|r| r.kind == RowKind::Equal),
            DiffResult::JsonPatch { ops } => ops.is_empty(),
            DiffResult::Summary(summary) => summary.is_empty(),
        }
    }
}
