//! Subcommands and the state they share

pub mod page;
pub mod render;
pub mod version;

use std::path::PathBuf;

use clap::Args;
use folio_core::logging_facility;
use folio_core_types::PageId;
use folio_engine::{EngineContext, FolioConfig};
use folio_store::repo::PageRepo;
use rusqlite::Connection;
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides the configuration)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Default language id (overrides the configuration)
    #[arg(long, global = true)]
    pub lang: Option<i64>,
}

/// Open database connection plus engine context
pub struct Session {
    pub conn: Connection,
    pub ctx: EngineContext,
}

impl Session {
    pub fn open(args: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match &args.config {
            Some(path) => FolioConfig::load(path)?,
            None => FolioConfig::default(),
        };
        if let Some(db) = &args.db {
            config.database_path = db.clone();
        }
        if let Some(lang) = args.lang {
            config.default_language_id = lang;
        }
        config.validate()?;

        logging_facility::init(config.logging.profile);

        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = folio_store::db::open_and_migrate(&config.database_path)?;
        tracing::debug!(db = %config.database_path.display(), "Opened database");

        Ok(Self {
            conn,
            ctx: EngineContext::new(config),
        })
    }

    /// Page id from a numeric id or a page keyword
    pub fn resolve_page(&self, page: &str) -> Result<PageId, Box<dyn std::error::Error>> {
        if let Ok(id) = page.parse::<i64>() {
            return Ok(PageId::new(id));
        }
        PageRepo::find_by_keyword(&self.conn, page)?
            .ok_or_else(|| format!("No page with keyword '{}'", page).into())
    }
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
