//! Core types shared across folio crates
//!
//! This crate provides foundational types used by the domain kernel,
//! the store and the engine:
//!
//! - **Identifiers**: PageId, VersionId, LanguageId, UserId
//! - **Schema constants**: Canonical field keys and event names for logging

pub mod ids;
pub mod schema;

pub use ids::{LanguageId, PageId, UserId, VersionId};
