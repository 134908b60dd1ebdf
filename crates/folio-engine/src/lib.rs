//! folio engine - orchestration layer
//!
//! Coordinates the kernel (hydration, caching, diffing) with the SQLite
//! store and shapes results into the HTTP response contract.

pub mod commands;
pub mod config;
pub mod context;
pub mod response;

pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use commands::engine_query::{apply_engine_query, EngineQuery, EngineQueryResult};
pub use commands::render::{render_page, RenderRequest, RenderResult};
pub use config::FolioConfig;
pub use context::EngineContext;
