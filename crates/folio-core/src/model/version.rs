use chrono::{DateTime, Utc};
use folio_core_types::{PageId, UserId, VersionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::Document;

/// An immutable snapshot of a page.
///
/// Publishing never touches `document`; it only stamps `published_at` and
/// moves the page's published pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub page_id: PageId,

    /// Monotonic per page, starting at 1
    pub version_number: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,

    /// Snapshot of the page with all languages, conditions and data-source configs
    pub document: Document,

    /// SHA-256 of the normalized snapshot
    pub content_digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: Value,
}

impl Version {
    pub fn summary(&self, is_published: bool) -> VersionSummary {
        VersionSummary {
            id: self.id,
            page_id: self.page_id,
            version_number: self.version_number,
            version_name: self.version_name.clone(),
            content_digest: self.content_digest.clone(),
            created_by: self.created_by,
            created_at: self.created_at,
            published_at: self.published_at,
            is_published,
        }
    }
}

/// Version row without its snapshot, as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub id: VersionId,
    pub page_id: PageId,
    pub version_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    pub content_digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// True when the page's published pointer references this version
    pub is_published: bool,
}
