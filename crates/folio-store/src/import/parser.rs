//! Definition parser with validation

use crate::errors::{import_validation, io_error, Result};
use crate::import::format::{PageDefinition, SectionDef};
use folio_core::hydration::JsonLogicEvaluator;
use std::path::Path;

/// Parse a definition file; `.json` files are read as JSON, anything else as YAML
pub fn parse_definition_file(path: &Path) -> Result<PageDefinition> {
    let content =
        std::fs::read_to_string(path).map_err(|e| io_error("parse_definition_file", e))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let definition: PageDefinition = serde_json::from_str(&content)
            .map_err(|e| import_validation(&format!("JSON parse error: {}", e)))?;
        validate(&definition)?;
        Ok(definition)
    } else {
        parse_definition_str(&content)
    }
}

/// Parse a YAML (or JSON) definition
pub fn parse_definition_str(content: &str) -> Result<PageDefinition> {
    let definition: PageDefinition = serde_yaml::from_str(content)
        .map_err(|e| import_validation(&format!("YAML parse error: {}", e)))?;
    validate(&definition)?;
    Ok(definition)
}

fn validate(definition: &PageDefinition) -> Result<()> {
    if definition.page.keyword.trim().is_empty() {
        return Err(import_validation("page keyword must not be empty"));
    }
    if definition.page.extra.contains_key("id") {
        return Err(import_validation(
            "page id is assigned by the store and cannot be set in a definition",
        ));
    }

    fn walk(sections: &[SectionDef], path: &str) -> Result<()> {
        for (index, section) in sections.iter().enumerate() {
            let here = format!("{}/{}", path, index);
            if section.style_kind.trim().is_empty() {
                return Err(import_validation(&format!("section {} has no style", here)));
            }
            if let Some(expression) = section.condition.as_ref().map(|c| c.expression()) {
                JsonLogicEvaluator::parse(&expression).map_err(|e| {
                    import_validation(&format!("section {} condition: {}", here, e))
                })?;
            }
            for source in &section.data_sources {
                if source.table.trim().is_empty() {
                    return Err(import_validation(&format!(
                        "section {} has a data source without a table",
                        here
                    )));
                }
            }
            if section.translations.contains_key(&0) {
                return Err(import_validation(&format!(
                    "section {} uses language 0, which is reserved for neutral fields",
                    here
                )));
            }
            walk(&section.children, &here)?;
        }
        Ok(())
    }
    walk(&definition.page.sections, "sections")?;

    for (table, rows) in &definition.data {
        if table.trim().is_empty() {
            return Err(import_validation("data table name must not be empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for row in rows {
            if !seen.insert((row.record_id, row.language_id)) {
                return Err(import_validation(&format!(
                    "duplicate record {} in data table '{}'",
                    row.record_id, table
                )));
            }
        }
    }
    Ok(())
}
