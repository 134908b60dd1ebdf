//! SQLite-backed sources for the render resolver

use crate::errors::Result;
use crate::repo::PageRepo;
use crate::versions;
use folio_core::errors::ExErrorKind;
use folio_core::model::{Document, Version};
use folio_core::resolver::{DraftSource, VersionSource};
use folio_core_types::{LanguageId, PageId, VersionId};
use rusqlite::Connection;

/// Draft and version access for one render request
///
/// Drafts are loaded already flattened to `language_id`; versions keep
/// every language and are collapsed during hydration.
pub struct SqlitePageSource<'c> {
    conn: &'c Connection,
    language_id: LanguageId,
}

impl<'c> SqlitePageSource<'c> {
    pub fn new(conn: &'c Connection, language_id: LanguageId) -> Self {
        Self { conn, language_id }
    }
}

impl VersionSource for SqlitePageSource<'_> {
    fn published_version_id(&self, page_id: PageId) -> Result<Option<VersionId>> {
        match PageRepo::published_version_id(self.conn, page_id) {
            Err(e) if e.kind() == ExErrorKind::NotFound => Ok(None),
            other => other,
        }
    }

    fn load_version(&self, version_id: VersionId) -> Result<Version> {
        versions::get_version(self.conn, version_id)
    }
}

impl DraftSource for SqlitePageSource<'_> {
    fn load_draft(&self, page_id: PageId) -> Result<Document> {
        PageRepo::load_draft(self.conn, page_id, self.language_id)
    }
}
