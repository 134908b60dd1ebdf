use folio_core_types::LanguageId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::content::{ContentField, DataSourceConfig};

fn is_false(b: &bool) -> bool {
    !*b
}

/// A section as it exists in storage: a live draft node or a node frozen
/// inside a version snapshot.
///
/// `children` order is significant and is preserved through hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: i64,

    /// Section name, handed to the condition evaluator
    #[serde(default)]
    pub keyword: String,

    /// Style this section renders with (e.g. `container`, `markdown`)
    pub style_kind: String,

    #[serde(default)]
    pub position: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<DataSourceConfig>,

    /// JSON-Logic expression text; the section always passes when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Keep the section with a debug payload when its condition fails
    #[serde(default, skip_serializing_if = "is_false")]
    pub debug: bool,

    #[serde(default)]
    pub content_fields: BTreeMap<String, ContentField>,

    /// Per-language field overrides; only present on stored (version) trees
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<LanguageId, BTreeMap<String, ContentField>>,

    #[serde(default)]
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    pub fn new(id: i64, style_kind: impl Into<String>) -> Self {
        Self {
            id,
            keyword: String::new(),
            style_kind: style_kind.into(),
            position: 0,
            data_sources: Vec::new(),
            condition: None,
            debug: false,
            content_fields: BTreeMap::new(),
            translations: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.content_fields
            .insert(name.into(), ContentField::new(content));
        self
    }

    pub fn with_data_source(mut self, config: DataSourceConfig) -> Self {
        self.data_sources.push(config);
        self
    }

    pub fn with_condition(mut self, expression: impl Into<String>) -> Self {
        self.condition = Some(expression.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_child(mut self, child: SectionNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(SectionNode::subtree_len).sum::<usize>()
    }
}

/// Structured explanation of a condition evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDebug {
    pub result: bool,

    /// The condition after placeholder substitution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Variable name → value each `var` lookup resolved to
    #[serde(default)]
    pub variables: Map<String, Value>,

    /// Extra fields reported by the evaluator
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A section after hydration: single-language fields, resolved data, and
/// only the children that passed their conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedSection {
    pub id: i64,
    pub keyword: String,
    pub style_kind: String,
    pub position: i32,
    pub content_fields: BTreeMap<String, ContentField>,

    /// Data retrieved by this section's own data sources
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_debug: Option<ConditionDebug>,

    pub children: Vec<HydratedSection>,
}

impl HydratedSection {
    /// Ids of this section and all retained descendants, pre-order
    pub fn collect_ids(&self, out: &mut Vec<i64>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Find a retained section by id in this subtree
    pub fn find(&self, id: i64) -> Option<&HydratedSection> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.content_fields.get(name).map(|f| f.content.as_str())
    }
}
