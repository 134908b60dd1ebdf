//! Error handling for folio-store
//!
//! Wraps folio-core ExError with store-specific helpers

use folio_core::errors::{ExError, ExErrorKind};
use folio_core_types::{PageId, VersionId};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a version-number race error
pub fn version_conflict(page_id: PageId, attempts: u32) -> ExError {
    ExError::new(ExErrorKind::Conflict)
        .with_op("create_version")
        .with_page_id(page_id)
        .with_message(format!(
            "version number kept colliding with concurrent writers after {} attempts",
            attempts
        ))
}

/// Create an error for deleting the version a page publishes
pub fn published_version_protected(page_id: PageId, version_id: VersionId) -> ExError {
    ExError::new(ExErrorKind::PublishedVersionProtected)
        .with_op("delete_version")
        .with_page_id(page_id)
        .with_version_id(version_id)
        .with_message("the published version cannot be deleted; unpublish it first")
}

/// Create a page-not-found error
pub fn page_not_found(op: &str, page_id: PageId) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op.to_string())
        .with_page_id(page_id)
        .with_message("page not found")
}

/// Create a version-not-found error
pub fn version_not_found(op: &str, version_id: VersionId) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op.to_string())
        .with_version_id(version_id)
        .with_message("version not found")
}

/// Create an import validation error
pub fn import_validation(reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("page_import")
        .with_message(reason.to_string())
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// True when `err` is a UNIQUE / PRIMARY KEY violation
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

/// True when SQLite gave up waiting for a lock
pub fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}
