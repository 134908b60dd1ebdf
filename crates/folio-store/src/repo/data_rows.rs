//! Data tables backing section data sources
//!
//! Rows live in a single `data_rows` table keyed by `table_name`. A row with
//! a NULL `language_id` is visible in every language.

use crate::errors::{from_rusqlite, Result};
use folio_core::errors::HydrationError;
use folio_core::hydration::DataSourceGateway;
use folio_core::model::{DataContext, DataSourceConfig};
use folio_core_types::LanguageId;
use rusqlite::Connection;
use serde_json::{Map, Value};

/// Insert one record into a data table
pub fn insert_row(
    conn: &Connection,
    table: &str,
    record_id: i64,
    language_id: Option<LanguageId>,
    payload: &Map<String, Value>,
) -> Result<i64> {
    let payload = serde_json::to_string(payload).map_err(folio_core::ExError::from)?;
    conn.execute(
        "INSERT INTO data_rows (table_name, record_id, language_id, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            table,
            record_id,
            language_id.map(LanguageId::get),
            payload,
            chrono::Utc::now().timestamp_millis(),
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(conn.last_insert_rowid())
}

/// Remove every record of a data table; returns the number removed
pub fn clear_table(conn: &Connection, table: &str) -> Result<usize> {
    conn.execute("DELETE FROM data_rows WHERE table_name = ?1", [table])
        .map_err(from_rusqlite)
}

/// Parsed `field=value;field=value` filter
#[derive(Debug, Clone, PartialEq, Default)]
struct RowFilter {
    clauses: Vec<(String, String)>,
}

impl RowFilter {
    fn parse(filter: Option<&str>) -> std::result::Result<Self, String> {
        let mut clauses = Vec::new();
        let Some(filter) = filter else {
            return Ok(Self { clauses });
        };
        for clause in filter.split(';').map(str::trim).filter(|c| !c.is_empty()) {
            let (field, value) = clause
                .split_once('=')
                .ok_or_else(|| format!("filter clause '{}' is not field=value", clause))?;
            let field = field.trim();
            if field.is_empty() {
                return Err(format!("filter clause '{}' has no field name", clause));
            }
            clauses.push((field.to_string(), value.trim().to_string()));
        }
        Ok(Self { clauses })
    }

    /// Values compare by their string form, so `7` matches `"7"`
    fn matches(&self, row: &Map<String, Value>) -> bool {
        self.clauses.iter().all(|(field, expected)| match row.get(field) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Null) | None => expected.is_empty(),
            Some(other) => other.to_string() == *expected,
        })
    }
}

/// [`DataSourceGateway`] reading the `data_rows` table of one connection
pub struct SqliteDataGateway<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteDataGateway<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Records of `table` visible in `language_id`, in record order
    pub fn rows(&self, table: &str, language_id: LanguageId) -> Result<Vec<Map<String, Value>>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT record_id, payload FROM data_rows
                 WHERE table_name = ?1 AND (language_id IS NULL OR language_id = ?2)
                 ORDER BY record_id, id",
            )
            .map_err(from_rusqlite)?;
        let raw = stmt
            .query_map(rusqlite::params![table, language_id.get()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        raw.into_iter()
            .map(|(record_id, payload)| -> Result<Map<String, Value>> {
                let value: Value = serde_json::from_str(&payload)?;
                let Value::Object(mut record) = value else {
                    return Err(folio_core::ExError::new(folio_core::ExErrorKind::InvalidDocument)
                        .with_op("data_rows")
                        .with_message(format!(
                            "record {} of table '{}' is not a JSON object",
                            record_id, table
                        )));
                };
                record.insert("record_id".to_string(), Value::from(record_id));
                Ok(record)
            })
            .collect()
    }
}

impl DataSourceGateway for SqliteDataGateway<'_> {
    fn fetch(
        &self,
        config: &DataSourceConfig,
        _context: &DataContext,
        language_id: LanguageId,
    ) -> std::result::Result<Value, HydrationError> {
        let failed = |reason: String| HydrationError::DataSourceFailed {
            section_id: 0,
            table: config.table.clone(),
            reason,
        };

        if config.table.trim().is_empty() {
            return Err(failed("no table configured".to_string()));
        }
        let filter = RowFilter::parse(config.filter.as_deref()).map_err(failed)?;
        let rows = self
            .rows(&config.table, language_id)
            .map_err(|e| failed(e.to_string()))?;

        let matching: Vec<Map<String, Value>> =
            rows.into_iter().filter(|r| filter.matches(r)).collect();
        tracing::debug!(
            table = %config.table,
            rows = matching.len(),
            "Fetched data-source rows"
        );
        Ok(config.retrieve.shape(matching))
    }
}
