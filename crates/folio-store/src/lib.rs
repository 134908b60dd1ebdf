//! folio persistence layer
//!
//! SQLite storage for drafts, immutable versions and the data tables that
//! section data sources read from.

pub mod db;
pub mod errors;
pub mod import;
pub mod migrations;
pub mod repo;
pub mod source;
pub mod versions;

pub use errors::Result;
pub use repo::{PageRepo, SqliteDataGateway};
pub use source::SqlitePageSource;
