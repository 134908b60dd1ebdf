//! Process-wide engine state shared by every request

use crate::config::FolioConfig;
use folio_core::cache::{CacheStore, ScopeKind};
use folio_core_types::PageId;

/// Cache category for hydrated published renders
pub const CATEGORY_PAGE_RENDER: &str = "page_render";

/// Cache category for version comparisons
pub const CATEGORY_VERSION_DIFF: &str = "version_diff";

/// Configuration plus the shared cache
///
/// Requests borrow it immutably; the cache synchronizes internally.
#[derive(Debug)]
pub struct EngineContext {
    pub config: FolioConfig,
    cache: CacheStore,
}

impl EngineContext {
    pub fn new(config: FolioConfig) -> Self {
        let cache = CacheStore::new(config.cache.to_cache_config());
        Self { config, cache }
    }

    /// The shared cache, or `None` when caching is disabled
    pub fn cache(&self) -> Option<&CacheStore> {
        self.config.cache.enabled.then_some(&self.cache)
    }

    /// Stale every cached render and diff of a page
    pub fn invalidate_page(&self, page_id: PageId) {
        self.cache.invalidate_entity_scope(ScopeKind::Page, page_id.get());
        tracing::debug!(page_id = page_id.get(), "Invalidated page scope");
    }

    /// Stale every cached render that read from `table`
    pub fn invalidate_data_table(&self, table: &str) {
        self.cache.invalidate_entity_scope(ScopeKind::DataTable, table);
        tracing::debug!(table, "Invalidated data-table scope");
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(FolioConfig::default())
    }
}
