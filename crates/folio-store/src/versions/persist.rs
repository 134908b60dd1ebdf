//! Version writes
//!
//! Version numbers are assigned inside an IMMEDIATE transaction as
//! `MAX(version_number) + 1`; the `UNIQUE(page_id, version_number)`
//! constraint backs that up across processes. A collision or a busy lock is
//! retried a bounded number of times and then reported as `Conflict`.

use crate::errors::{
    from_rusqlite, is_busy, is_unique_violation, page_not_found, published_version_protected,
    version_conflict, version_not_found, Result,
};
use crate::repo::PageRepo;
use crate::versions::query::get_version;
use chrono::Utc;
use folio_core::errors::{ExError, ExErrorKind};
use folio_core::model::{Document, Version};
use folio_core::normalize::content_digest;
use folio_core_types::{PageId, UserId, VersionId};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;

/// Attempts before a version-number collision is reported as `Conflict`
pub const MAX_CREATE_ATTEMPTS: u32 = 5;

/// Input for [`create_version`]
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    pub page_id: PageId,
    pub document: &'a Document,
    pub version_name: Option<String>,
    pub created_by: Option<UserId>,
    pub metadata: Value,
}

impl<'a> NewVersion<'a> {
    pub fn new(page_id: PageId, document: &'a Document) -> Self {
        Self {
            page_id,
            document,
            version_name: None,
            created_by: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.version_name = Some(name.into());
        self
    }

    pub fn with_author(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Persist a new immutable snapshot of a page
///
/// The snapshot is stored verbatim; its digest is taken over the
/// normalized form.
///
/// # Errors
///
/// - `NotFound` if the page does not exist
/// - `InvalidInput` if the document belongs to another page
/// - `Conflict` if the version number kept colliding with concurrent writers
pub fn create_version(conn: &mut Connection, new: &NewVersion<'_>) -> Result<Version> {
    if new.document.page_id() != new.page_id {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("create_version")
            .with_page_id(new.page_id)
            .with_message(format!(
                "snapshot belongs to page {}",
                new.document.page_id()
            )));
    }
    if !PageRepo::page_exists(conn, new.page_id)? {
        return Err(page_not_found("create_version", new.page_id));
    }

    let snapshot = new.document.to_snapshot_value()?;
    let digest = content_digest(&snapshot)?;
    let snapshot_text = serde_json::to_string(&snapshot)?;
    let metadata_text = serde_json::to_string(&new.metadata)?;

    for attempt in 1..=MAX_CREATE_ATTEMPTS {
        match insert_next(conn, new, &snapshot_text, &digest, &metadata_text) {
            Ok(id) => {
                let version = get_version(conn, id)?;
                tracing::debug!(
                    page_id = new.page_id.get(),
                    version_id = id.get(),
                    version_number = version.version_number,
                    "Created version"
                );
                return Ok(version);
            }
            Err(e) if is_unique_violation(&e) || is_busy(&e) => {
                tracing::debug!(
                    page_id = new.page_id.get(),
                    attempt,
                    "Version number collision, retrying: {}",
                    e
                );
            }
            Err(e) => return Err(from_rusqlite(e)),
        }
    }
    Err(version_conflict(new.page_id, MAX_CREATE_ATTEMPTS))
}

fn insert_next(
    conn: &mut Connection,
    new: &NewVersion<'_>,
    snapshot: &str,
    digest: &str,
    metadata: &str,
) -> rusqlite::Result<VersionId> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let number: i64 = tx.query_row(
        "SELECT COALESCE(MAX(version_number), 0) + 1 FROM page_versions WHERE page_id = ?1",
        [new.page_id.get()],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO page_versions
            (page_id, version_number, version_name, snapshot, content_digest, created_by, created_at, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            new.page_id.get(),
            number,
            new.version_name,
            snapshot,
            digest,
            new.created_by.map(UserId::get),
            Utc::now().timestamp_millis(),
            metadata,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(VersionId::new(id))
}

/// Make `version_id` the page's published version
///
/// Stamps `published_at` on the version and moves the page pointer in one
/// transaction; the snapshot itself is never touched.
///
/// # Errors
///
/// - `NotFound` if the version does not exist or belongs to another page
pub fn publish(conn: &mut Connection, page_id: PageId, version_id: VersionId) -> Result<Version> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let owner: Option<i64> = tx
        .query_row(
            "SELECT page_id FROM page_versions WHERE id = ?1",
            [version_id.get()],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;
    if owner != Some(page_id.get()) {
        return Err(version_not_found("publish", version_id).with_page_id(page_id));
    }

    tx.execute(
        "UPDATE page_versions SET published_at = ?1 WHERE id = ?2",
        rusqlite::params![Utc::now().timestamp_millis(), version_id.get()],
    )
    .map_err(from_rusqlite)?;
    tx.execute(
        "UPDATE pages SET published_version_id = ?1 WHERE id = ?2",
        rusqlite::params![version_id.get(), page_id.get()],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)?;

    get_version(conn, version_id)
}

/// Clear the page's published pointer; returns the version it pointed to
pub fn unpublish(conn: &Connection, page_id: PageId) -> Result<Option<VersionId>> {
    let previous = PageRepo::published_version_id(conn, page_id)?;
    conn.execute(
        "UPDATE pages SET published_version_id = NULL WHERE id = ?1",
        [page_id.get()],
    )
    .map_err(from_rusqlite)?;
    Ok(previous)
}

/// Delete one version of a page
///
/// # Errors
///
/// - `PublishedVersionProtected` if the page currently publishes it
/// - `NotFound` if the version does not exist or belongs to another page
pub fn delete_version(conn: &mut Connection, page_id: PageId, version_id: VersionId) -> Result<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let published: Option<Option<i64>> = tx
        .query_row(
            "SELECT published_version_id FROM pages WHERE id = ?1",
            [page_id.get()],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;
    let published = published.ok_or_else(|| page_not_found("delete_version", page_id))?;
    if published == Some(version_id.get()) {
        return Err(published_version_protected(page_id, version_id));
    }

    let deleted = tx
        .execute(
            "DELETE FROM page_versions WHERE id = ?1 AND page_id = ?2",
            rusqlite::params![version_id.get(), page_id.get()],
        )
        .map_err(from_rusqlite)?;
    if deleted == 0 {
        return Err(version_not_found("delete_version", version_id).with_page_id(page_id));
    }
    tx.commit().map_err(from_rusqlite)?;
    Ok(())
}

/// Delete all but the newest `keep` versions of a page
///
/// The published version is never deleted and does not count against
/// `keep`. Returns the ids that were removed, oldest first.
pub fn delete_oldest(conn: &mut Connection, page_id: PageId, keep: usize) -> Result<Vec<VersionId>> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    let published: Option<Option<i64>> = tx
        .query_row(
            "SELECT published_version_id FROM pages WHERE id = ?1",
            [page_id.get()],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;
    let published = published.ok_or_else(|| page_not_found("prune_versions", page_id))?;

    let ids: Vec<i64> = {
        let mut stmt = tx
            .prepare(
                "SELECT id FROM page_versions WHERE page_id = ?1
                 ORDER BY version_number DESC",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([page_id.get()], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<i64>, _>>()
            .map_err(from_rusqlite)?;
        rows
    };

    let mut doomed: Vec<i64> = ids
        .into_iter()
        .filter(|id| Some(*id) != published)
        .skip(keep)
        .collect();
    doomed.reverse();

    for id in &doomed {
        tx.execute("DELETE FROM page_versions WHERE id = ?1", [id])
            .map_err(from_rusqlite)?;
    }
    tx.commit().map_err(from_rusqlite)?;

    Ok(doomed.into_iter().map(VersionId::new).collect())
}
