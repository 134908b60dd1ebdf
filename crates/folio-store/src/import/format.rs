//! Page definition file format
//!
//! ```yaml
//! page:
//!   keyword: home
//!   url: /home
//!   sections:
//!     - style: markdown
//!       condition: '{"==": [{"var": "__language_id__"}, 1]}'
//!       fields:
//!         text: "Welcome {{profile.name}}"
//!       translations:
//!         2:
//!           text: "Willkommen {{profile.name}}"
//! data:
//!   profile:
//!     - record_id: 1
//!       name: Ada
//! ```

use folio_core::model::{ContentField, DataSourceConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDefinition {
    pub page: PageDef,

    /// Data-table rows to load alongside the page; each listed table is replaced
    #[serde(default)]
    pub data: BTreeMap<String, Vec<DataRowDef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDef {
    pub keyword: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub nav_position: Option<i32>,

    #[serde(default)]
    pub sections: Vec<SectionDef>,

    /// Any other page attribute, carried into the page metadata verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDef {
    #[serde(default)]
    pub keyword: String,

    #[serde(alias = "style")]
    pub style_kind: String,

    #[serde(default)]
    pub condition: Option<ConditionDef>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,

    /// Language-neutral fields
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,

    /// Language id → field overrides
    #[serde(default)]
    pub translations: BTreeMap<i64, BTreeMap<String, FieldDef>>,

    #[serde(default)]
    pub children: Vec<SectionDef>,
}

impl SectionDef {
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(SectionDef::subtree_len).sum::<usize>()
    }
}

/// A condition written either as expression text or as inline JSON-Logic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionDef {
    Text(String),
    Logic(Value),
}

impl ConditionDef {
    pub fn expression(&self) -> String {
        match self {
            ConditionDef::Text(text) => text.clone(),
            ConditionDef::Logic(value) => value.to_string(),
        }
    }
}

/// A field given as plain text or with editor metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDef {
    Text(String),
    Full(ContentField),
}

impl FieldDef {
    pub fn to_content_field(&self) -> ContentField {
        match self {
            FieldDef::Text(text) => ContentField::new(text.clone()),
            FieldDef::Full(field) => field.clone(),
        }
    }
}

/// One data-table record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRowDef {
    pub record_id: i64,

    /// Visible in every language when absent
    #[serde(default)]
    pub language_id: Option<i64>,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}
