use std::collections::HashMap;
use std::sync::Mutex;

use folio_core::errors::{ExError, ExErrorKind, HydrationError, Result};
use folio_core::hydration::DataSourceGateway;
use folio_core::model::{DataContext, DataSourceConfig, Document, PageMetadata, SectionNode, Version};
use folio_core::resolver::{DraftSource, VersionSource};
use folio_core_types::{LanguageId, PageId, VersionId};
use serde_json::{Map, Value};

/// In-memory data tables keyed by table name
///
/// Filters use the `field=value[;field=value]` syntax; a table named
/// `broken` always fails.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryGateway {
    tables: HashMap<String, Vec<Map<String, Value>>>,
    calls: Mutex<Vec<DataSourceConfig>>,
}

#[allow(dead_code)]
impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        self.tables.insert(table.to_string(), rows);
        self
    }

    /// Configs as the gateway received them, after interpolation
    pub fn calls(&self) -> Vec<DataSourceConfig> {
        self.calls.lock().unwrap().clone()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DataSourceGateway for MemoryGateway {
    fn fetch(
        &self,
        config: &DataSourceConfig,
        _context: &DataContext,
        _language_id: LanguageId,
    ) -> std::result::Result<Value, HydrationError> {
        self.calls.lock().unwrap().push(config.clone());
        if config.table == "broken" {
            return Err(HydrationError::DataSourceFailed {
                section_id: 0,
                table: config.table.clone(),
                reason: "table is broken".to_string(),
            });
        }
        let rows = self.tables.get(&config.table).cloned().unwrap_or_default();
        let clauses: Vec<(String, String)> = config
            .filter
            .as_deref()
            .unwrap_or("")
            .split(';')
            .filter_map(|c| c.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let rows = rows
            .into_iter()
            .filter(|row| {
                clauses
                    .iter()
                    .all(|(k, v)| row.get(k).map(scalar_text).as_deref() == Some(v.as_str()))
            })
            .collect();
        Ok(config.retrieve.shape(rows))
    }
}

/// Draft and version store backed by maps
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryPages {
    pub drafts: HashMap<PageId, Document>,
    pub versions: HashMap<VersionId, Version>,
    pub published: HashMap<PageId, VersionId>,
    /// Versions whose load fails as if the row were corrupt
    pub corrupt: Vec<VersionId>,
}

impl DraftSource for MemoryPages {
    fn load_draft(&self, page_id: PageId) -> Result<Document> {
        self.drafts.get(&page_id).cloned().ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("load_draft")
                .with_page_id(page_id)
        })
    }
}

impl VersionSource for MemoryPages {
    fn published_version_id(&self, page_id: PageId) -> Result<Option<VersionId>> {
        Ok(self.published.get(&page_id).copied())
    }

    fn load_version(&self, version_id: VersionId) -> Result<Version> {
        if self.corrupt.contains(&version_id) {
            return Err(ExError::new(ExErrorKind::InvalidDocument)
                .with_op("load_version")
                .with_version_id(version_id));
        }
        self.versions.get(&version_id).cloned().ok_or_else(|| {
            ExError::new(ExErrorKind::NotFound)
                .with_op("load_version")
                .with_version_id(version_id)
        })
    }
}

#[allow(dead_code)]
pub fn page(id: i64, keyword: &str) -> Document {
    Document::new(PageMetadata::new(PageId::new(id), keyword))
}

#[allow(dead_code)]
pub fn version_of(id: i64, document: Document, number: i64) -> Version {
    Version {
        id: VersionId::new(id),
        page_id: document.page_id(),
        version_number: number,
        version_name: None,
        content_digest: String::new(),
        created_by: None,
        created_at: chrono::Utc::now(),
        published_at: None,
        metadata: Value::Null,
        document,
    }
}

#[allow(dead_code)]
pub fn text_section(id: i64, text: &str) -> SectionNode {
    SectionNode::new(id, "markdown").with_field("text", text)
}
