//! Command orchestration layer.
//!
//! Writes go through [`engine_command::apply_engine_command`], reads through
//! [`engine_query::apply_engine_query`]; rendering has its own entry point
//! in [`render`].

pub mod engine_command;
pub mod engine_query;
pub mod render;
