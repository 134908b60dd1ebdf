//! Engine-level read-only query surface.
//!
//! `apply_engine_query` takes a shared connection and never writes.

use std::time::Instant;

use folio_core::cache::ScopeKind;
use folio_core::diff::{diff_documents, render_human_summary, DiffFormat, DiffResult};
use folio_core::errors::{ExError, ExErrorKind, Result};
use folio_core::model::{Version, VersionSummary};
use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::{PageId, VersionId};
use folio_store::repo::PageRepo;
use folio_store::versions;
use rusqlite::Connection;
use serde::Serialize;

use crate::context::{EngineContext, CATEGORY_VERSION_DIFF};

/// Page size used when a listing names none
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ---------------------------------------------------------------------------
// EngineQuery
// ---------------------------------------------------------------------------

/// Read-only queries supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineQuery {
    /// One page of a page's versions, newest first.
    ListVersions {
        page_id: PageId,
        /// 1-based
        page: u32,
        page_size: u32,
    },
    /// A single version with its snapshot.
    GetVersion {
        page_id: PageId,
        version_id: VersionId,
    },
    /// Compare two versions of the same page.
    CompareVersions {
        page_id: PageId,
        version1: VersionId,
        version2: VersionId,
        /// Wire name of the diff format; unknown names are rejected
        format: String,
    },
}

impl EngineQuery {
    fn op(&self) -> &'static str {
        match self {
            EngineQuery::ListVersions { .. } => "list_versions",
            EngineQuery::GetVersion { .. } => "get_version",
            EngineQuery::CompareVersions { .. } => "compare_versions",
        }
    }
}

/// A page of version summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionPage {
    pub items: Vec<VersionSummary>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Response payload of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareResult {
    pub version1: VersionSummary,
    pub version2: VersionSummary,
    pub format: DiffFormat,
    pub diff: DiffResult,
    /// Markdown rendering, for summary diffs only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_summary: Option<String>,
}

/// Result of a read-only query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngineQueryResult {
    Versions(VersionPage),
    Version(Box<Version>),
    Comparison(Box<CompareResult>),
}

/// Apply a read-only query.
pub fn apply_engine_query(
    query: EngineQuery,
    conn: &Connection,
    ctx: &EngineContext,
) -> Result<EngineQueryResult> {
    let op = query.op();
    log_op_start!(op);
    let start = Instant::now();

    let result = match query {
        // ── ListVersions ──────────────────────────────────────────────────────
        EngineQuery::ListVersions {
            page_id,
            page,
            page_size,
        } => (|| -> Result<EngineQueryResult> {
            if !PageRepo::page_exists(conn, page_id)? {
                return Err(folio_store::errors::page_not_found("list_versions", page_id));
            }
            let (items, total) = versions::list_for_page(conn, page_id, page, page_size)?;
            Ok(EngineQueryResult::Versions(VersionPage {
                items,
                total,
                page,
                page_size,
            }))
        })(),

        // ── GetVersion ────────────────────────────────────────────────────────
        EngineQuery::GetVersion {
            page_id,
            version_id,
        } => load_owned(conn, page_id, version_id, "get_version")
            .map(|v| EngineQueryResult::Version(Box::new(v))),

        // ── CompareVersions ───────────────────────────────────────────────────
        EngineQuery::CompareVersions {
            page_id,
            version1,
            version2,
            format,
        } => compare(conn, ctx, page_id, version1, version2, &format)
            .map(|c| EngineQueryResult::Comparison(Box::new(c))),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_op_end!(op, duration_ms = elapsed),
        Err(e) => {
            let e_clone = e.clone();
            log_op_error!(op, e_clone, duration_ms = elapsed);
        }
    }
    result
}

/// Load a version and check it belongs to `page_id`
fn load_owned(conn: &Connection, page_id: PageId, version_id: VersionId, op: &str) -> Result<Version> {
    let version = versions::get_version(conn, version_id)?;
    if version.page_id != page_id {
        return Err(ExError::new(ExErrorKind::NotFound)
            .with_op(op)
            .with_page_id(page_id)
            .with_version_id(version_id)
            .with_message("version does not belong to this page"));
    }
    Ok(version)
}

fn compare(
    conn: &Connection,
    ctx: &EngineContext,
    page_id: PageId,
    version1: VersionId,
    version2: VersionId,
    format: &str,
) -> Result<CompareResult> {
    let format: DiffFormat = format.parse()?;
    let old = load_owned(conn, page_id, version1, "compare_versions")?;
    let new = load_owned(conn, page_id, version2, "compare_versions")?;

    let diff = if old.content_digest == new.content_digest {
        tracing::debug!(
            page_id = page_id.get(),
            version1 = version1.get(),
            version2 = version2.get(),
            "Versions share a content digest, skipping diff"
        );
        DiffResult::empty(format)
    } else {
        let compute = || diff_documents(&old.document, &new.document, format);
        match ctx.cache() {
            Some(cache) => cache
                .with_category(CATEGORY_VERSION_DIFF)
                .with_entity_scope(ScopeKind::Page, page_id.get())
                .try_get(&format!("{}:{}:{}", version1, version2, format), compute)?,
            None => compute()?,
        }
    };

    let human_summary = match &diff {
        DiffResult::Summary(summary) => Some(render_human_summary(summary)),
        _ => None,
    };

    let published = PageRepo::published_version_id(conn, page_id)?;
    Ok(CompareResult {
        version1: old.summary(published == Some(old.id)),
        version2: new.summary(published == Some(new.id)),
        format,
        diff,
        human_summary,
    })
}
