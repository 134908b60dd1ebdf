//! folio kernel: content model, hydration, caching, source resolution and
//! version comparison.
//!
//! Nothing in this crate performs I/O. Storage sits behind the
//! [`resolver::VersionSource`] / [`resolver::DraftSource`] traits and data
//! retrieval behind [`hydration::DataSourceGateway`].

pub mod cache;
pub mod diff;
pub mod errors;
pub mod hydration;
pub mod logging_facility;
pub mod model;
pub mod normalize;
pub mod resolver;

#[doc(hidden)]
pub use folio_core_types as core_types;

pub use errors::{ExError, ExErrorKind, HydrationError, Result};
pub use model::{Document, HydratedDocument, SectionNode, Version};
