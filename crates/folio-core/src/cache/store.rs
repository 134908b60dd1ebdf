use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::scope::{EntityScope, ScopeKind};

/// Optional policies layered on top of generation invalidation.
///
/// Neither is needed for correctness; they only bound memory and age.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries older than this are recomputed
    pub ttl: Option<Duration>,
    /// Upper bound on stored entries; stale entries are evicted first, then the oldest
    pub max_entries: Option<usize>,
}

/// Hit/miss counters since the store was created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    category: String,
    scopes: Vec<EntityScope>,
    key: String,
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    category_generation: u64,
    scope_generations: Vec<u64>,
    /// Scopes reported by the computation itself, with their generations
    dependencies: Vec<(EntityScope, u64)>,
    stored_at: Instant,
}

type Counters<K> = RwLock<HashMap<K, Arc<AtomicU64>>>;

/// Shared cache state. Hand out [`ScopedCache`] handles via [`CacheStore::with_category`].
///
/// Reads take shared locks only. Population is a last-write-wins upsert, so
/// two workers missing on the same key may both compute it.
pub struct CacheStore {
    config: CacheConfig,
    entries: RwLock<HashMap<EntryKey, Entry>>,
    scope_generations: Counters<EntityScope>,
    category_generations: Counters<String>,
    /// Bumped on every scope invalidation
    invalidations: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            scope_generations: RwLock::new(HashMap::new()),
            category_generations: RwLock::new(HashMap::new()),
            invalidations: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Start a handle bound to `category`
    pub fn with_category(&self, category: impl Into<String>) -> ScopedCache<'_> {
        ScopedCache {
            store: self,
            category: category.into(),
            scopes: Vec::new(),
        }
    }

    /// Advance the generation of `(kind, id)`, staling every entry bound to it
    pub fn invalidate_entity_scope(&self, kind: ScopeKind, id: impl ToString) {
        let scope = EntityScope::new(kind, id);
        let generation = bump(&self.scope_generations, &scope);
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(scope = %scope, generation, "Invalidated entity scope");
    }

    /// Advance the generation of `category`, staling every entry in it
    pub fn invalidate_category(&self, category: &str) {
        let generation = bump(&self.category_generations, &category.to_string());
        tracing::debug!(cache_category = category, generation, "Invalidated cache category");
    }

    /// Current generation of a scope (0 if never invalidated)
    pub fn scope_generation(&self, kind: ScopeKind, id: impl ToString) -> u64 {
        current(&self.scope_generations, &EntityScope::new(kind, id))
    }

    /// Drop every entry that can no longer be served. Returns the number removed.
    pub fn purge_stale(&self) -> usize {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, entry| self.is_fresh(key, entry));
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn is_fresh(&self, key: &EntryKey, entry: &Entry) -> bool {
        if let Some(ttl) = self.config.ttl {
            if entry.stored_at.elapsed() > ttl {
                return false;
            }
        }
        if current(&self.category_generations, &key.category) != entry.category_generation {
            return false;
        }
        let bound = key
            .scopes
            .iter()
            .zip(&entry.scope_generations)
            .all(|(scope, generation)| current(&self.scope_generations, scope) == *generation);
        bound
            && entry
                .dependencies
                .iter()
                .all(|(scope, generation)| current(&self.scope_generations, scope) == *generation)
    }

    fn lookup<T: Clone + 'static>(&self, key: &EntryKey) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if !self.is_fresh(key, entry) {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Generations to stamp on an entry, read before its value is computed so
    /// an invalidation that lands mid-computation still stales it.
    fn capture(&self, key: &EntryKey) -> (u64, Vec<u64>) {
        let category_generation = current(&self.category_generations, &key.category);
        let scope_generations = key
            .scopes
            .iter()
            .map(|s| current(&self.scope_generations, s))
            .collect();
        (category_generation, scope_generations)
    }

    fn store<T: Send + Sync + 'static>(
        &self,
        key: EntryKey,
        generations: (u64, Vec<u64>),
        dependencies: Vec<(EntityScope, u64)>,
        value: T,
    ) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            Entry {
                value: Arc::new(value),
                category_generation: generations.0,
                scope_generations: generations.1,
                dependencies,
                stored_at: Instant::now(),
            },
        );

        if let Some(max) = self.config.max_entries {
            if entries.len() > max {
                entries.retain(|k, e| self.is_fresh(k, e));
            }
            while entries.len() > max {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        entries.remove(&k);
                    }
                    None => break,
                }
            }
        }
    }
}

fn current<K: Eq + Hash>(counters: &Counters<K>, key: &K) -> u64 {
    counters
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .map(|g| g.load(Ordering::SeqCst))
        .unwrap_or(0)
}

fn bump<K: Eq + Hash + Clone>(counters: &Counters<K>, key: &K) -> u64 {
    if let Some(counter) = counters
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
    {
        return counter.fetch_add(1, Ordering::SeqCst) + 1;
    }
    counters
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key.clone())
        .or_insert_with(|| Arc::new(AtomicU64::new(0)))
        .fetch_add(1, Ordering::SeqCst)
        + 1
}

/// A cache handle bound to one category and a set of entity scopes.
pub struct ScopedCache<'a> {
    store: &'a CacheStore,
    category: String,
    scopes: Vec<EntityScope>,
}

impl<'a> ScopedCache<'a> {
    /// Bind the handle to an additional `(kind, id)` scope
    pub fn with_entity_scope(mut self, kind: ScopeKind, id: impl ToString) -> Self {
        self.push_scope(EntityScope::new(kind, id));
        self
    }

    pub fn with_scope(mut self, scope: EntityScope) -> Self {
        self.push_scope(scope);
        self
    }

    fn push_scope(&mut self, scope: EntityScope) {
        if let Err(pos) = self.scopes.binary_search(&scope) {
            self.scopes.insert(pos, scope);
        }
    }

    pub fn scopes(&self) -> &[EntityScope] {
        &self.scopes
    }

    fn entry_key(&self, key: &str) -> EntryKey {
        EntryKey {
            category: self.category.clone(),
            scopes: self.scopes.clone(),
            key: key.to_string(),
        }
    }

    /// Return the cached value for `key`, computing and storing it when absent or stale
    pub fn get<T, F>(&self, key: &str, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        match self.try_get(key, || Ok::<T, std::convert::Infallible>(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`ScopedCache::get`] for fallible computations; errors are not cached
    pub fn try_get<T, E, F>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let entry_key = self.entry_key(key);
        if let Some(value) = self.store.lookup::<T>(&entry_key) {
            self.store.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache_category = %self.category, key, cache_hit = true, "Cache lookup");
            return Ok(value);
        }
        self.store.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(cache_category = %self.category, key, cache_hit = false, "Cache lookup");

        let generations = self.store.capture(&entry_key);
        let value = compute()?;
        self.store.store(entry_key, generations, Vec::new(), value.clone());
        Ok(value)
    }

    /// Like [`ScopedCache::get`] for values whose dependencies are only known
    /// once computed.
    ///
    /// `compute` returns the value and the extra scopes it read. The entry is
    /// staled by those scopes as well as the handle's own. If any scope is
    /// invalidated while `compute` runs, the value is returned but not stored.
    pub fn get_with_dependencies<T, F>(&self, key: &str, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> (T, Vec<EntityScope>),
    {
        let entry_key = self.entry_key(key);
        if let Some(value) = self.store.lookup::<T>(&entry_key) {
            self.store.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache_category = %self.category, key, cache_hit = true, "Cache lookup");
            return value;
        }
        self.store.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(cache_category = %self.category, key, cache_hit = false, "Cache lookup");

        let epoch = self.store.invalidations.load(Ordering::SeqCst);
        let generations = self.store.capture(&entry_key);
        let (value, scopes) = compute();
        let dependencies: Vec<(EntityScope, u64)> = scopes
            .into_iter()
            .map(|scope| {
                let generation = current(&self.store.scope_generations, &scope);
                (scope, generation)
            })
            .collect();
        if self.store.invalidations.load(Ordering::SeqCst) == epoch {
            self.store
                .store(entry_key, generations, dependencies, value.clone());
        }
        value
    }

    /// List-valued variant of [`ScopedCache::get`]
    pub fn get_list<T, F>(&self, key: &str, compute: F) -> Vec<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Vec<T>,
    {
        self.get(key, compute)
    }

    /// List-valued variant of [`ScopedCache::try_get`]
    pub fn try_get_list<T, E, F>(&self, key: &str, compute: F) -> Result<Vec<T>, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        self.try_get(key, compute)
    }

    /// Stale every entry in this handle's category
    pub fn invalidate_category(&self) {
        self.store.invalidate_category(&self.category);
    }
}
