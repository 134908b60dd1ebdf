//! Engine-level write commands.
//!
//! The store write commits first; the affected cache scopes are bumped
//! afterwards. A crash in between leaves a stale entry that the next write
//! to the same scope clears.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use folio_core::errors::{ExError, ExErrorKind, Result};
use folio_core::model::Version;
use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::{PageId, UserId, VersionId};
use folio_store::import::{import_definition, parse_definition_file, ImportReport};
use folio_store::repo::PageRepo;
use folio_store::versions::{self, NewVersion};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::context::EngineContext;

/// Write commands supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Snapshot the current draft as a new, unpublished version.
    CreateVersion {
        page_id: PageId,
        version_name: Option<String>,
        created_by: Option<UserId>,
        metadata: Value,
    },
    /// Snapshot the current draft and publish it.
    Publish {
        page_id: PageId,
        version_name: Option<String>,
        created_by: Option<UserId>,
        metadata: Value,
    },
    /// Publish an existing version (e.g. roll back).
    PublishVersion {
        page_id: PageId,
        version_id: VersionId,
    },
    Unpublish {
        page_id: PageId,
    },
    DeleteVersion {
        page_id: PageId,
        version_id: VersionId,
    },
    /// Delete all but the newest `keep` versions; the published one is kept.
    PruneVersions {
        page_id: PageId,
        keep: usize,
    },
    /// Replace a page's draft from a YAML or JSON definition file.
    ImportPage {
        path: PathBuf,
    },
}

impl EngineCommand {
    /// Snapshot-and-publish with no name, author or metadata
    pub fn publish(page_id: PageId) -> Self {
        EngineCommand::Publish {
            page_id,
            version_name: None,
            created_by: None,
            metadata: Value::Object(Default::default()),
        }
    }

    fn op(&self) -> &'static str {
        match self {
            EngineCommand::CreateVersion { .. } => "create_version",
            EngineCommand::Publish { .. } => "publish",
            EngineCommand::PublishVersion { .. } => "publish_version",
            EngineCommand::Unpublish { .. } => "unpublish",
            EngineCommand::DeleteVersion { .. } => "delete_version",
            EngineCommand::PruneVersions { .. } => "prune_versions",
            EngineCommand::ImportPage { .. } => "page_import",
        }
    }
}

/// Response payload of a publish
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub page_id: PageId,
    pub version_id: VersionId,
    pub version_number: i64,
    pub published_at: DateTime<Utc>,
    /// Versions removed by the retention policy
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pruned: Vec<VersionId>,
    /// Set when the retention pass failed; the publish itself is committed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune_error: Option<String>,
}

/// Result of applying an engine command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EngineCommandResult {
    VersionCreated {
        page_id: PageId,
        version_id: VersionId,
        version_number: i64,
        content_digest: String,
    },
    Published(PublishResult),
    Unpublished {
        page_id: PageId,
        previous_version_id: Option<VersionId>,
    },
    VersionDeleted {
        page_id: PageId,
        version_id: VersionId,
    },
    Pruned {
        page_id: PageId,
        deleted: Vec<VersionId>,
    },
    Imported(ImportReport),
}

/// Apply a write command.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    ctx: &EngineContext,
) -> Result<EngineCommandResult> {
    let op = cmd.op();
    log_op_start!(op);
    let start = Instant::now();

    let result = match cmd {
        EngineCommand::CreateVersion {
            page_id,
            version_name,
            created_by,
            metadata,
        } => snapshot_draft(conn, page_id, version_name, created_by, metadata).map(|v| {
            EngineCommandResult::VersionCreated {
                page_id,
                version_id: v.id,
                version_number: v.version_number,
                content_digest: v.content_digest,
            }
        }),

        EngineCommand::Publish {
            page_id,
            version_name,
            created_by,
            metadata,
        } => snapshot_draft(conn, page_id, version_name, created_by, metadata)
            .and_then(|v| publish_version(conn, ctx, page_id, v.id)),

        EngineCommand::PublishVersion {
            page_id,
            version_id,
        } => publish_version(conn, ctx, page_id, version_id),

        EngineCommand::Unpublish { page_id } => versions::unpublish(conn, page_id).map(|previous| {
            ctx.invalidate_page(page_id);
            EngineCommandResult::Unpublished {
                page_id,
                previous_version_id: previous,
            }
        }),

        EngineCommand::DeleteVersion {
            page_id,
            version_id,
        } => versions::delete_version(conn, page_id, version_id).map(|()| {
            ctx.invalidate_page(page_id);
            EngineCommandResult::VersionDeleted {
                page_id,
                version_id,
            }
        }),

        EngineCommand::PruneVersions { page_id, keep } => prune(conn, ctx, page_id, keep)
            .map(|deleted| EngineCommandResult::Pruned { page_id, deleted }),

        EngineCommand::ImportPage { path } => import_page(conn, ctx, &path),
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

fn snapshot_draft(
    conn: &mut Connection,
    page_id: PageId,
    version_name: Option<String>,
    created_by: Option<UserId>,
    metadata: Value,
) -> Result<Version> {
    let document = PageRepo::load_document(conn, page_id)?;
    let new = NewVersion {
        page_id,
        document: &document,
        version_name,
        created_by,
        metadata,
    };
    versions::create_version(conn, &new)
}

fn publish_version(
    conn: &mut Connection,
    ctx: &EngineContext,
    page_id: PageId,
    version_id: VersionId,
) -> Result<EngineCommandResult> {
    let version = versions::publish(conn, page_id, version_id)?;
    ctx.invalidate_page(page_id);

    let published_at = version.published_at.ok_or_else(|| {
        ExError::new(ExErrorKind::Internal)
            .with_op("publish")
            .with_version_id(version_id)
            .with_message("published version has no publication time")
    })?;

    // the publish has committed; a retention failure must not undo its result
    let (pruned, prune_error) = match ctx.config.retention.keep_versions {
        Some(keep) => match prune(conn, ctx, page_id, keep as usize) {
            Ok(pruned) => (pruned, None),
            Err(e) => {
                tracing::warn!(
                    page_id = page_id.get(),
                    version_id = version_id.get(),
                    err_code = e.code(),
                    "Retention after publish failed: {}",
                    e
                );
                (Vec::new(), Some(e.to_string()))
            }
        },
        None => (Vec::new(), None),
    };

    tracing::info!(
        page_id = page_id.get(),
        version_id = version_id.get(),
        version_number = version.version_number,
        pruned = pruned.len(),
        "Published version"
    );

    Ok(EngineCommandResult::Published(PublishResult {
        page_id,
        version_id,
        version_number: version.version_number,
        published_at,
        pruned,
        prune_error,
    }))
}

fn prune(
    conn: &mut Connection,
    ctx: &EngineContext,
    page_id: PageId,
    keep: usize,
) -> Result<Vec<VersionId>> {
    let deleted = versions::delete_oldest(conn, page_id, keep)?;
    if !deleted.is_empty() {
        ctx.invalidate_page(page_id);
    }
    Ok(deleted)
}

fn import_page(
    conn: &mut Connection,
    ctx: &EngineContext,
    path: &std::path::Path,
) -> Result<EngineCommandResult> {
    let definition = parse_definition_file(path)?;
    let report = import_definition(&definition, conn)?;
    for table in definition.data.keys() {
        ctx.invalidate_data_table(table);
    }
    Ok(EngineCommandResult::Imported(report))
}
