//! Default `{{placeholder}}` substitution.

use serde_json::Value;

use super::collaborators::InterpolationEngine;
use crate::model::DataContext;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Resolve a dotted path (`scope.field`, `scope.0.field`) against the context.
///
/// Numeric segments index into arrays; every other segment is an object key.
pub fn lookup_path<'a>(context: &'a DataContext, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Text a resolved value is rendered as inside content
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Placeholder engine over the merged data context.
///
/// Whitespace inside the braces is ignored. A placeholder whose path does not
/// resolve is left in the output verbatim so editors can spot it; a path that
/// resolves to `null` renders as empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderInterpolator;

impl InterpolationEngine for PlaceholderInterpolator {
    fn substitute(&self, template: &str, context: &DataContext) -> String {
        if !template.contains(OPEN) {
            return template.to_string();
        }

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                out.push_str(&rest[start..]);
                return out;
            };
            let path = after_open[..end].trim();
            match lookup_path(context, path) {
                Some(value) if !path.is_empty() => out.push_str(&render(value)),
                _ => out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]),
            }
            rest = &after_open[end + CLOSE.len()..];
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> DataContext {
        json!({
            "parent": {"record_id": 7, "name": "Ada"},
            "rows": [{"score": 3.5}, {"score": 4}],
            "flag": true,
            "missing_value": null
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_dotted_lookup() {
        let s = PlaceholderInterpolator.substitute("record_id={{parent.record_id}}", &ctx());
        assert_eq!(s, "record_id=7");
    }

    #[test]
    fn test_array_index_and_whitespace() {
        let s = PlaceholderInterpolator.substitute("{{ rows.1.score }} / {{rows.0.score}}", &ctx());
        assert_eq!(s, "4 / 3.5");
    }

    #[test]
    fn test_strings_unquoted_scalars_as_json() {
        let s = PlaceholderInterpolator.substitute("{{parent.name}} {{flag}} [{{missing_value}}]", &ctx());
        assert_eq!(s, "Ada true []");
    }

    #[test]
    fn test_unresolved_placeholder_is_kept() {
        let s = PlaceholderInterpolator.substitute("a {{nope.x}} b {{}}", &ctx());
        assert_eq!(s, "a {{nope.x}} b {{}}");
    }

    #[test]
    fn test_unterminated_placeholder_is_kept() {
        let s = PlaceholderInterpolator.substitute("x {{parent.name} y", &ctx());
        assert_eq!(s, "x {{parent.name} y");
    }

    #[test]
    fn test_object_renders_as_json() {
        let s = PlaceholderInterpolator.substitute("{{parent}}", &ctx());
        let parsed: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(parsed["record_id"], json!(7));
    }
}
