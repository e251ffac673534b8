//! Response cache for registry lookups.
//!
//! A bounded, LRU-evicting store shared by every Stage 2 worker. Lookups go
//! through [`ResponseCache::get_or_compute`], which guarantees a single
//! in-flight computation per key: concurrent callers for the same domain
//! wait for the first one and receive its result.

use crate::types::RegistryResponse;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// What the cache remembers about one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedLookup {
    /// The registry answered with registration data (possibly empty)
    Response(RegistryResponse),

    /// The registry explicitly reported no match
    NoMatch,

    /// Every attempt failed; remembered so the run does not try again
    Failed { attempts: u32, last_error: String },
}

impl CachedLookup {
    /// Whether this entry is the failure sentinel.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Bounded single-flight cache keyed by domain name.
pub struct ResponseCache {
    entries: Cache<String, CachedLookup>,
    capacity: u64,
    computations: AtomicU64,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            entries,
            capacity,
            computations: AtomicU64::new(0),
        }
    }

    /// Return the cached entry for `key`, computing it on a miss.
    ///
    /// At most one `compute` future runs per key at any time. Callers that
    /// arrive while it is running wait and share its result.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> CachedLookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CachedLookup>,
    {
        self.entries
            .get_with_by_ref(key, async {
                self.computations.fetch_add(1, Ordering::Relaxed);
                compute().await
            })
            .await
    }

    /// Peek at an entry without computing it.
    pub async fn get(&self, key: &str) -> Option<CachedLookup> {
        self.entries.get(key).await
    }

    /// Number of times a miss triggered a computation.
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// Approximate number of live entries.
    ///
    /// Eviction is applied lazily; call [`Self::run_pending_tasks`] first for
    /// an up-to-date count.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Apply pending evictions and bookkeeping.
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.entries.entry_count())
            .field("computations", &self.computations())
            .finish()
    }
}
