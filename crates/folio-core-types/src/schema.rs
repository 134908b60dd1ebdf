//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the kernel, the store
//! and the engine so log queries do not depend on which layer emitted.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_PAGE_ID: &str = "page_id";
pub const FIELD_VERSION_ID: &str = "version_id";
pub const FIELD_VERSION_NUMBER: &str = "version_number";
pub const FIELD_SECTION_ID: &str = "section_id";
pub const FIELD_LANGUAGE_ID: &str = "language_id";

// Cache fields
pub const FIELD_CACHE_CATEGORY: &str = "cache_category";
pub const FIELD_CACHE_HIT: &str = "cache_hit";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_DEGRADED: &str = "degraded";
pub const EVENT_FALLBACK: &str = "fallback";
