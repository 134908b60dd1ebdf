//! Line-level diffs over normalized text, built on `similar`.

use similar::{ChangeTag, DiffTag, TextDiff};

use super::model::{DiffHunk, DiffLine, RowKind, Segment, SideBySideRow, SideCell};

const CONTEXT_LINES: usize = 3;

fn line_text(line: &str) -> String {
    line.trim_end_matches('\n').to_string()
}

/// Unified hunks with three lines of context
pub fn unified_hunks(old: &str, new: &str) -> Vec<DiffHunk> {
    if old == new {
        return Vec::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(CONTEXT_LINES) {
        let Some(first) = group.first() else {
            continue;
        };
        let mut hunk = DiffHunk {
            old_start: first.old_range().start + 1,
            old_count: 0,
            new_start: first.new_range().start + 1,
            new_count: 0,
            lines: Vec::new(),
        };

        for op in &group {
            for change in diff.iter_changes(op) {
                let text = line_text(change.value());
                match change.tag() {
                    ChangeTag::Equal => {
                        hunk.lines.push(DiffLine::Context(text));
                        hunk.old_count += 1;
                        hunk.new_count += 1;
                    }
                    ChangeTag::Delete => {
                        hunk.lines.push(DiffLine::Removed(text));
                        hunk.old_count += 1;
                    }
                    ChangeTag::Insert => {
                        hunk.lines.push(DiffLine::Added(text));
                        hunk.new_count += 1;
                    }
                }
            }
        }
        hunks.push(hunk);
    }

    hunks
}

/// Render hunks as classic `@@ -a,b +c,d @@` text
pub fn render_unified(hunks: &[DiffHunk], old_label: &str, new_label: &str) -> String {
    let mut out = format!("--- {}\n+++ {}\n", old_label, new_label);
    for hunk in hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for line in &hunk.lines {
            let (prefix, text) = match line {
                DiffLine::Context(t) => (' ', t),
                DiffLine::Added(t) => ('+', t),
                DiffLine::Removed(t) => ('-', t),
            };
            out.push(prefix);
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

fn plain_cell(line_number: usize, text: String) -> SideCell {
    SideCell {
        line_number,
        segments: vec![Segment {
            text: text.clone(),
            highlighted: false,
        }],
        text,
    }
}

/// Word-level highlighting of a changed line pair
fn highlight(old_line: &str, new_line: &str) -> (Vec<Segment>, Vec<Segment>) {
    fn push(segments: &mut Vec<Segment>, text: &str, highlighted: bool) {
        match segments.last_mut() {
            Some(last) if last.highlighted == highlighted => last.text.push_str(text),
            _ => segments.push(Segment {
                text: text.to_string(),
                highlighted,
            }),
        }
    }

    let diff = TextDiff::from_words(old_line, new_line);
    let mut left = Vec::new();
    let mut right = Vec::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                push(&mut left, change.value(), false);
                push(&mut right, change.value(), false);
            }
            ChangeTag::Delete => push(&mut left, change.value(), true),
            ChangeTag::Insert => push(&mut right, change.value(), true),
        }
    }
    (left, right)
}

/// Paired rows covering both texts in full, with word-level highlights on
/// changed lines
pub fn side_by_side_rows(old: &str, new: &str) -> Vec<SideBySideRow> {
    let diff = TextDiff::from_lines(old, new);
    let old_lines = diff.old_slices();
    let new_lines = diff.new_slices();
    let mut rows = Vec::new();

    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                for (o, n) in old_range.zip(new_range) {
                    rows.push(SideBySideRow {
                        kind: RowKind::Equal,
                        left: Some(plain_cell(o + 1, line_text(old_lines[o]))),
                        right: Some(plain_cell(n + 1, line_text(new_lines[n]))),
                    });
                }
            }
            DiffTag::Delete => {
                for o in old_range {
                    rows.push(SideBySideRow {
                        kind: RowKind::Removed,
                        left: Some(plain_cell(o + 1, line_text(old_lines[o]))),
                        right: None,
                    });
                }
            }
            DiffTag::Insert => {
                for n in new_range {
                    rows.push(SideBySideRow {
                        kind: RowKind::Added,
                        left: None,
                        right: Some(plain_cell(n + 1, line_text(new_lines[n]))),
                    });
                }
            }
            DiffTag::Replace => {
                let paired = old_range.len().min(new_range.len());
                for (o, n) in old_range.clone().zip(new_range.clone()) {
                    let (l, r) = (line_text(old_lines[o]), line_text(new_lines[n]));
                    let (left_segments, right_segments) = highlight(&l, &r);
                    rows.push(SideBySideRow {
                        kind: RowKind::Changed,
                        left: Some(SideCell {
                            line_number: o + 1,
                            text: l,
                            segments: left_segments,
                        }),
                        right: Some(SideCell {
                            line_number: n + 1,
                            text: r,
                            segments: right_segments,
                        }),
                    });
                }
                for o in old_range.skip(paired) {
                    rows.push(SideBySideRow {
                        kind: RowKind::Removed,
                        left: Some(plain_cell(o + 1, line_text(old_lines[o]))),
                        right: None,
                    });
                }
                for n in new_range.skip(paired) {
                    rows.push(SideBySideRow {
                        kind: RowKind::Added,
                        left: None,
                        right: Some(plain_cell(n + 1, line_text(new_lines[n]))),
                    });
                }
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_has_no_hunks() {
        assert!(unified_hunks("a\nb\n", "a\nb\n").is_empty());
    }

    #[test]
    fn test_single_line_change() {
        let hunks = unified_hunks("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!((hunk.old_start, hunk.old_count), (1, 3));
        assert!(hunk.lines.contains(&DiffLine::Removed("b".to_string())));
        assert!(hunk.lines.contains(&DiffLine::Added("B".to_string())));
    }

    #[test]
    fn test_render_unified_header() {
        let text = render_unified(&unified_hunks("a\n", "b\n"), "v1", "v2");
        assert!(text.starts_with("--- v1\n+++ v2\n@@ -1,1 +1,1 @@\n"));
        assert!(text.contains("-a\n+b\n"));
    }

    #[test]
    fn test_side_by_side_highlights_changed_words() {
        let rows = side_by_side_rows(
            "  \"title\": \"Hello world\"\n",
            "  \"title\": \"Hello there\"\n",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::Changed);
        let left = rows[0].left.as_ref().unwrap();
        let highlighted: Vec<&str> = left
            .segments
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(highlighted.concat().trim_matches('"'), "world");
    }

    #[test]
    fn test_side_by_side_covers_both_sides() {
        let rows = side_by_side_rows("a\nb\n", "a\nb\nc\n");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].kind, RowKind::Added);
        assert!(rows[2].left.is_none());
        assert_eq!(rows[2].right.as_ref().unwrap().line_number, 3);
    }
}
