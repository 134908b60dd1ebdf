use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Key → value data visible to a section while it is hydrated.
///
/// Top-level keys are data-source scopes (or ordinal indexes) plus the
/// seeded `__keyword__` / `__language_id__` / `__user_id__` variables.
pub type DataContext = Map<String, Value>;

/// An interpolatable content value with its editor metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentField {
    /// Raw text, may contain `{{var}}` placeholders
    pub content: String,

    /// Field metadata (field type, editor hints); opaque to hydration
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

impl ContentField {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            meta: Value::Null,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

/// Shape in which a data source's rows are handed to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieveMode {
    /// The first matching record as an object
    First,
    /// The last matching record as an object
    #[default]
    Last,
    /// Column map: field → array of values
    All,
    /// Array of record objects
    AllAsArray,
    /// Array of record objects serialized to a JSON string
    #[serde(rename = "JSON", alias = "json")]
    Json,
}

impl RetrieveMode {
    /// Shape fetched rows according to this mode.
    ///
    /// Column maps fill `null` where a row lacks a field so every column has
    /// one entry per row.
    pub fn shape(self, rows: Vec<Map<String, Value>>) -> Value {
        match self {
            RetrieveMode::First => rows.into_iter().next().map(Value::Object).unwrap_or(Value::Null),
            RetrieveMode::Last => rows.into_iter().last().map(Value::Object).unwrap_or(Value::Null),
            RetrieveMode::All => {
                let fields: BTreeSet<String> =
                    rows.iter().flat_map(|r| r.keys().cloned()).collect();
                let mut columns = Map::new();
                for field in fields {
                    let column: Vec<Value> = rows
                        .iter()
                        .map(|r| r.get(&field).cloned().unwrap_or(Value::Null))
                        .collect();
                    columns.insert(field, Value::Array(column));
                }
                Value::Object(columns)
            }
            RetrieveMode::AllAsArray => {
                Value::Array(rows.into_iter().map(Value::Object).collect())
            }
            RetrieveMode::Json => {
                let array = Value::Array(rows.into_iter().map(Value::Object).collect());
                Value::String(array.to_string())
            }
        }
    }
}

/// One configured data source on a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Data table the rows come from
    pub table: String,

    /// Context key the result is stored under; ordinal index when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub retrieve: RetrieveMode,

    /// Row filter, may reference parent data via `{{scope.field}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Gateway-specific parameters; string values are interpolated too
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl DataSourceConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            scope: None,
            retrieve: RetrieveMode::default(),
            filter: None,
            params: Map::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_retrieve(mut self, retrieve: RetrieveMode) -> Self {
        self.retrieve = retrieve;
        self
    }

    /// Context key for the `index`-th data source of a section
    pub fn context_key(&self, index: usize) -> String {
        self.scope.clone().unwrap_or_else(|| index.to_string())
    }
}
