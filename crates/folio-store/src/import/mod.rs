//! Page definition import
//!
//! Provides:
//! - The page definition file format (YAML or JSON)
//! - Parser with validation
//! - Importer that replaces a page's draft sections

pub mod format;
pub mod importer;
pub mod parser;

pub use format::{DataRowDef, FieldDef, PageDef, PageDefinition, SectionDef};
pub use importer::{import_definition, import_page_file, ImportReport};
pub use parser::{parse_definition_file, parse_definition_str};
