use serde_json::Value;

use super::model::{DiffEntry, DiffSummary};

fn show(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => format!("{:?}", s),
        Some(other) => other.to_string(),
        None => "(none)".to_string(),
    }
}

fn section(out: &mut String, title: &str, entries: &[DiffEntry], line: impl Fn(&DiffEntry) -> String) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {} ({})\n\n", title, entries.len()));
    for entry in entries {
        out.push_str(&format!("- {}\n", line(entry)));
    }
}

/// Markdown report of a summary diff
pub fn render_human_summary(summary: &DiffSummary) -> String {
    let mut out = String::from("# Version comparison\n");
    if summary.is_empty() {
        out.push_str("\nNo differences.\n");
        return out;
    }

    out.push_str(&format!(
        "\n{} addition(s), {} removal(s), {} change(s)\n",
        summary.additions.len(),
        summary.removals.len(),
        summary.changes.len()
    ));
    section(&mut out, "Additions", &summary.additions, |e| {
        format!("`{}`: {}", e.path, show(e.new_value.as_ref()))
    });
    section(&mut out, "Removals", &summary.removals, |e| {
        format!("`{}` (was {})", e.path, show(e.old_value.as_ref()))
    });
    section(&mut out, "Changes", &summary.changes, |e| {
        format!(
            "`{}`: {} -> {}",
            e.path,
            show(e.old_value.as_ref()),
            show(e.new_value.as_ref())
        )
    });
    out
}
