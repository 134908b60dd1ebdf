use folio_core_types::{LanguageId, PageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::section::{HydratedSection, SectionNode};
use crate::errors::{ExError, ExErrorKind, Result};

/// Page-level attributes carried alongside the section tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub id: PageId,
    pub keyword: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_position: Option<i32>,

    /// Any further page attributes, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PageMetadata {
    pub fn new(id: PageId, keyword: impl Into<String>) -> Self {
        Self {
            id,
            keyword: keyword.into(),
            url: None,
            nav_position: None,
            extra: BTreeMap::new(),
        }
    }
}

/// The root content object: page metadata plus its ordered section tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: PageMetadata,
    #[serde(default)]
    pub sections: Vec<SectionNode>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEnvelope {
    page: SnapshotPage,
}

#[derive(Serialize, Deserialize)]
struct SnapshotPage {
    #[serde(flatten)]
    metadata: PageMetadata,
    #[serde(default)]
    sections: Vec<SectionNode>,
}

impl Document {
    pub fn new(metadata: PageMetadata) -> Self {
        Self {
            metadata,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: SectionNode) -> Self {
        self.sections.push(section);
        self
    }

    pub fn page_id(&self) -> PageId {
        self.metadata.id
    }

    /// Convert to the stored snapshot shape `{ "page": { ..., "sections": [...] } }`
    pub fn to_snapshot_value(&self) -> Result<Value> {
        let envelope = SnapshotEnvelope {
            page: SnapshotPage {
                metadata: self.metadata.clone(),
                sections: self.sections.clone(),
            },
        };
        serde_json::to_value(envelope).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("to_snapshot_value")
                .with_page_id(self.metadata.id)
                .with_message(format!("failed to serialize snapshot: {}", e))
        })
    }

    /// Parse the stored snapshot shape back into a document
    ///
    /// # Errors
    ///
    /// - `InvalidDocument` if the value does not have the snapshot shape
    pub fn from_snapshot_value(value: Value) -> Result<Self> {
        let envelope: SnapshotEnvelope = serde_json::from_value(value).map_err(|e| {
            ExError::new(ExErrorKind::InvalidDocument)
                .with_op("from_snapshot_value")
                .with_message(format!("snapshot does not match page shape: {}", e))
        })?;
        Ok(Self {
            metadata: envelope.page.metadata,
            sections: envelope.page.sections,
        })
    }
}

/// A fully hydrated, single-language document ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedDocument {
    pub metadata: PageMetadata,
    pub language_id: LanguageId,
    pub sections: Vec<HydratedSection>,
}

impl HydratedDocument {
    /// Find a retained section anywhere in the tree
    pub fn find_section(&self, id: i64) -> Option<&HydratedSection> {
        self.sections.iter().find_map(|s| s.find(id))
    }

    /// Ids of all retained sections, pre-order
    pub fn section_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for section in &self.sections {
            section.collect_ids(&mut ids);
        }
        ids
    }
}
