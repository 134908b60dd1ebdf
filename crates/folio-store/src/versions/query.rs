//! Version reads

use crate::errors::{from_rusqlite, Result};
use crate::versions::from_millis;
use folio_core::errors::{ExError, ExErrorKind};
use folio_core::model::{Document, Version, VersionSummary};
use folio_core_types::{PageId, UserId, VersionId};
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::Value;

const VERSION_COLUMNS: &str = "id, page_id, version_number, version_name, snapshot, \
     content_digest, created_by, created_at, published_at, metadata";

struct VersionRow {
    id: i64,
    page_id: i64,
    version_number: i64,
    version_name: Option<String>,
    snapshot: String,
    content_digest: String,
    created_by: Option<i64>,
    created_at: i64,
    published_at: Option<i64>,
    metadata: String,
}

impl VersionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            page_id: row.get(1)?,
            version_number: row.get(2)?,
            version_name: row.get(3)?,
            snapshot: row.get(4)?,
            content_digest: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
            published_at: row.get(8)?,
            metadata: row.get(9)?,
        })
    }

    fn into_version(self) -> Result<Version> {
        let id = VersionId::new(self.id);
        let invalid = |reason: String| {
            ExError::new(ExErrorKind::InvalidDocument)
                .with_op("get_version")
                .with_version_id(id)
                .with_page_id(PageId::new(self.page_id))
                .with_message(reason)
        };
        let snapshot: Value = serde_json::from_str(&self.snapshot)
            .map_err(|e| invalid(format!("stored snapshot is not valid JSON: {}", e)))?;
        let document = Document::from_snapshot_value(snapshot)
            .map_err(|e| invalid(e.message().to_string()))?;
        let metadata = serde_json::from_str(&self.metadata).unwrap_or_else(|e| {
            tracing::warn!(
                page_id = self.page_id,
                version_id = self.id,
                "Ignoring unreadable version metadata: {}",
                e
            );
            Value::Null
        });

        Ok(Version {
            id,
            page_id: PageId::new(self.page_id),
            version_number: self.version_number,
            version_name: self.version_name,
            document,
            content_digest: self.content_digest,
            created_by: self.created_by.map(UserId::new),
            created_at: from_millis(self.created_at)?,
            published_at: self.published_at.map(from_millis).transpose()?,
            metadata,
        })
    }
}

/// Load a version with its snapshot
///
/// # Errors
///
/// - `NotFound` if no such version exists
/// - `InvalidDocument` if the stored snapshot cannot be parsed
pub fn get_version(conn: &Connection, version_id: VersionId) -> Result<Version> {
    let sql = format!("SELECT {} FROM page_versions WHERE id = ?1", VERSION_COLUMNS);
    let row = conn
        .query_row(&sql, [version_id.get()], VersionRow::from_row)
        .optional()
        .map_err(from_rusqlite)?;
    row.ok_or_else(|| crate::errors::version_not_found("get_version", version_id))?
        .into_version()
}

/// Load a page's version by its per-page number
pub fn get_by_number(conn: &Connection, page_id: PageId, version_number: i64) -> Result<Version> {
    let sql = format!(
        "SELECT {} FROM page_versions WHERE page_id = ?1 AND version_number = ?2",
        VERSION_COLUMNS
    );
    let row = conn
        .query_row(
            &sql,
            rusqlite::params![page_id.get(), version_number],
            VersionRow::from_row,
        )
        .optional()
        .map_err(from_rusqlite)?;
    row.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("get_by_number")
            .with_page_id(page_id)
            .with_message(format!("version number {} not found", version_number))
    })?
    .into_version()
}

/// One page of a page's versions, newest first, plus the total count
///
/// `page` is 1-based.
///
/// # Errors
///
/// - `InvalidInput` if `page` or `page_size` is zero
pub fn list_for_page(
    conn: &Connection,
    page_id: PageId,
    page: u32,
    page_size: u32,
) -> Result<(Vec<VersionSummary>, u64)> {
    if page == 0 || page_size == 0 {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("list_versions")
            .with_page_id(page_id)
            .with_message("page and page_size must be at least 1"));
    }

    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM page_versions WHERE page_id = ?1",
            [page_id.get()],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;

    let offset = i64::from(page - 1) * i64::from(page_size);
    let mut stmt = conn
        .prepare(
            "SELECT v.id, v.version_number, v.version_name, v.content_digest, v.created_by,
                    v.created_at, v.published_at, p.published_version_id = v.id
             FROM page_versions v
             JOIN pages p ON p.id = v.page_id
             WHERE v.page_id = ?1
             ORDER BY v.version_number DESC
             LIMIT ?2 OFFSET ?3",
        )
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(
            rusqlite::params![page_id.get(), i64::from(page_size), offset],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                    row.get::<_, Option<bool>>(7)?,
                ))
            },
        )
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    let summaries = rows
        .into_iter()
        .map(
            |(id, version_number, version_name, content_digest, created_by, created_at, published_at, is_published)| -> Result<VersionSummary> {
                Ok(VersionSummary {
                    id: VersionId::new(id),
                    page_id,
                    version_number,
                    version_name,
                    content_digest,
                    created_by: created_by.map(UserId::new),
                    created_at: from_millis(created_at)?,
                    published_at: published_at.map(from_millis).transpose()?,
                    is_published: is_published.unwrap_or(false),
                })
            },
        )
        .collect::<Result<Vec<_>>>()?;

    Ok((summaries, total.max(0) as u64))
}

/// All version numbers of a page, ascending
pub fn version_numbers(conn: &Connection, page_id: PageId) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT version_number FROM page_versions WHERE page_id = ?1 ORDER BY version_number")
        .map_err(from_rusqlite)?;
    let numbers = stmt
        .query_map([page_id.get()], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<i64>, _>>()
        .map_err(from_rusqlite)?;
    Ok(numbers)
}
