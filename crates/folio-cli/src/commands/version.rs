//! Version commands

use clap::{Args, Subcommand};
use folio_core::diff::DiffFormat;
use folio_core_types::{UserId, VersionId};
use folio_engine::commands::engine_query::DEFAULT_PAGE_SIZE;
use folio_engine::{
    apply_engine_command, apply_engine_query, EngineCommand, EngineQuery, EngineQueryResult,
};
use serde_json::Value;

use super::{print_json, CliResult, Session};

#[derive(Debug, Args)]
pub struct VersionArgs {
    #[command(subcommand)]
    pub command: VersionCommand,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Page id or keyword
    pub page: String,

    #[arg(long)]
    pub name: Option<String>,

    /// Author user id
    #[arg(long)]
    pub author: Option<i64>,

    /// Free-form JSON object stored with the version
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Snapshot the draft without publishing it
    Create(SnapshotArgs),
    /// Snapshot the draft and publish it, or publish an existing version
    Publish {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Publish this existing version instead of snapshotting the draft
        #[arg(long, conflicts_with_all = ["name", "author", "metadata"])]
        version: Option<i64>,
    },
    /// Clear the published pointer; the page serves its draft again
    Unpublish { page: String },
    /// List versions, newest first
    List {
        page: String,
        #[arg(long, default_value_t = 1)]
        page_number: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },
    /// Show one version with its snapshot
    Show { page: String, version: i64 },
    /// Compare two versions
    Compare {
        page: String,
        version1: i64,
        version2: i64,
        /// unified, side_by_side, json_patch or summary
        #[arg(long, default_value = "summary")]
        format: String,
        /// Print the Markdown report of a summary diff
        #[arg(long)]
        human: bool,
    },
    /// Delete an unpublished version
    Delete { page: String, version: i64 },
    /// Keep only the newest versions (the published one always survives)
    Prune {
        page: String,
        #[arg(long)]
        keep: usize,
    },
}

pub fn execute(args: VersionArgs, session: &mut Session) -> CliResult {
    let command = match args.command {
        VersionCommand::Create(snapshot) => {
            let (page_id, version_name, created_by, metadata) = snapshot_fields(snapshot, session)?;
            EngineCommand::CreateVersion {
                page_id,
                version_name,
                created_by,
                metadata,
            }
        }
        VersionCommand::Publish {
            snapshot,
            version: Some(version),
        } => EngineCommand::PublishVersion {
            page_id: session.resolve_page(&snapshot.page)?,
            version_id: VersionId::new(version),
        },
        VersionCommand::Publish {
            snapshot,
            version: None,
        } => {
            let (page_id, version_name, created_by, metadata) = snapshot_fields(snapshot, session)?;
            EngineCommand::Publish {
                page_id,
                version_name,
                created_by,
                metadata,
            }
        }
        VersionCommand::Unpublish { page } => EngineCommand::Unpublish {
            page_id: session.resolve_page(&page)?,
        },
        VersionCommand::Delete { page, version } => EngineCommand::DeleteVersion {
            page_id: session.resolve_page(&page)?,
            version_id: VersionId::new(version),
        },
        VersionCommand::Prune { page, keep } => EngineCommand::PruneVersions {
            page_id: session.resolve_page(&page)?,
            keep,
        },
        VersionCommand::List {
            page,
            page_number,
            page_size,
        } => {
            let query = EngineQuery::ListVersions {
                page_id: session.resolve_page(&page)?,
                page: page_number,
                page_size,
            };
            return print_json(&apply_engine_query(query, &session.conn, &session.ctx)?);
        }
        VersionCommand::Show { page, version } => {
            let query = EngineQuery::GetVersion {
                page_id: session.resolve_page(&page)?,
                version_id: VersionId::new(version),
            };
            return print_json(&apply_engine_query(query, &session.conn, &session.ctx)?);
        }
        VersionCommand::Compare {
            page,
            version1,
            version2,
            format,
            human,
        } => {
            if human && format != DiffFormat::Summary.as_str() {
                return Err("--human requires --format summary".into());
            }
            let query = EngineQuery::CompareVersions {
                page_id: session.resolve_page(&page)?,
                version1: VersionId::new(version1),
                version2: VersionId::new(version2),
                format,
            };
            let result = apply_engine_query(query, &session.conn, &session.ctx)?;
            if let (true, EngineQueryResult::Comparison(compare)) = (human, &result) {
                print!("{}", compare.human_summary.as_deref().unwrap_or_default());
                return Ok(());
            }
            return print_json(&result);
        }
    };

    let result = apply_engine_command(command, &mut session.conn, &session.ctx)?;
    print_json(&result)
}

type SnapshotFields = (
    folio_core_types::PageId,
    Option<String>,
    Option<UserId>,
    Value,
);

fn snapshot_fields(
    args: SnapshotArgs,
    session: &Session,
) -> Result<SnapshotFields, Box<dyn std::error::Error>> {
    let metadata = match args.metadata.as_deref() {
        Some(text) => {
            let value: Value = serde_json::from_str(text)?;
            if !value.is_object() {
                return Err("--metadata must be a JSON object".into());
            }
            value
        }
        None => Value::Object(Default::default()),
    };
    Ok((
        session.resolve_page(&args.page)?,
        args.name,
        args.author.map(UserId::new),
        metadata,
    ))
}
