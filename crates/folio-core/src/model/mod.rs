pub mod content;
pub mod document;
pub mod section;
pub mod version;

pub use content::{ContentField, DataContext, DataSourceConfig, RetrieveMode};
pub use document::{Document, HydratedDocument, PageMetadata};
pub use section::{ConditionDebug, HydratedSection, SectionNode};
pub use version::{Version, VersionSummary};
