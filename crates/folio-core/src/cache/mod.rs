//! Entity-scoped cache with generation-based invalidation.
//!
//! Entries are bound to a category and a set of `(kind, id)` entity scopes.
//! Each scope and each category owns a monotonically increasing generation
//! counter; an entry records the generations it was computed under and is
//! stale as soon as any of them advances. Invalidation is therefore a single
//! counter bump, independent of how many entries reference the scope.
//!
//! ```
//! use folio_core::cache::{CacheStore, ScopeKind};
//!
//! let cache = CacheStore::default();
//! let handle = cache.with_category("page_render").with_entity_scope(ScopeKind::Page, 5);
//! assert_eq!(handle.get("k", || 1), 1);
//! assert_eq!(handle.get("k", || 2), 1);
//! cache.invalidate_entity_scope(ScopeKind::Page, 5);
//! assert_eq!(handle.get("k", || 3), 3);
//! ```

pub mod scope;
pub mod store;

pub use scope::{EntityScope, ScopeKind};
pub use store::{CacheConfig, CacheStats, CacheStore, ScopedCache};
