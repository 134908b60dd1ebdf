//! Immutable page versions and the published pointer

pub mod persist;
pub mod query;

pub use persist::{
    create_version, delete_oldest, delete_version, publish, unpublish, NewVersion,
    MAX_CREATE_ATTEMPTS,
};
pub use query::{get_by_number, get_version, list_for_page, version_numbers};

use crate::errors::Result;
use chrono::{DateTime, TimeZone, Utc};
use folio_core::errors::{ExError, ExErrorKind};

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        ExError::new(ExErrorKind::Persistence)
            .with_op("version_timestamp")
            .with_message(format!("stored timestamp {} is out of range", ms))
    })
}
