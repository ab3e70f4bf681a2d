//! Resolution cache for merged attributes
//!
//! Bounded, write-expiring cache keyed by principal. Concurrent misses for the
//! same key are coalesced: one caller computes, the rest wait for its result.
//! Entries carry the source registry version they were computed against and
//! are dropped once a caller expects a newer one.

use moka::future::Cache;
use moka::notification::RemovalCause;
use sase_common::{AtomicCounter, AttributeMap, PrincipalKey};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of resolving a principal; `None` means no source had data
pub type Resolution = Option<Arc<AttributeMap>>;

/// Resolution stamped with the registry version it was computed against
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub version: u64,
    pub resolution: Resolution,
}

impl Versioned {
    pub fn new(version: u64, resolution: Resolution) -> Self {
        Self { version, resolution }
    }
}

/// Cache sizing and expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum resident entries
    pub maximum_size: u64,
    /// Time-to-live measured from insertion
    pub time_to_live: Duration,
    /// Keep no-match results as well
    pub cache_null_results: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            maximum_size: 10_000,
            time_to_live: Duration::from_secs(30 * 60),
            cache_null_results: false,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Principal-keyed resolution cache
pub struct ResolutionCache {
    cache: Cache<PrincipalKey, Versioned>,
    settings: CacheSettings,
    hits: AtomicCounter,
    misses: AtomicCounter,
}

impl ResolutionCache {
    /// Create cache with settings
    pub fn new(settings: CacheSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.maximum_size)
            .time_to_live(settings.time_to_live)
            .eviction_listener(|key: Arc<PrincipalKey>, _value: Versioned, cause: RemovalCause| {
                tracing::trace!("Removed cached attributes for [{}]: {:?}", key, cause);
            })
            .build();

        Self {
            cache,
            settings,
            hits: AtomicCounter::new(0),
            misses: AtomicCounter::new(0),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Return the cached resolution for `key`, computing it with `init` on a miss
    ///
    /// `init` runs at most once per key at a time; callers arriving while it
    /// runs receive its result. No-match results are only stored when
    /// `cache_null_results` is set. An entry stamped below `version` is stale:
    /// it is dropped and computed again.
    pub async fn get_or_resolve<F, Fut>(&self, key: PrincipalKey, version: u64, mut init: F) -> Resolution
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Versioned>,
    {
        loop {
            let entry = if self.settings.cache_null_results {
                let entry = self.cache.entry(key.clone()).or_insert_with(init()).await;
                self.record(entry.is_fresh());
                entry.into_value()
            } else {
                let fut = init();
                let entry = self
                    .cache
                    .entry(key.clone())
                    .or_optionally_insert_with(async move {
                        let computed = fut.await;
                        computed.resolution.is_some().then_some(computed)
                    })
                    .await;

                match entry {
                    Some(entry) => {
                        self.record(entry.is_fresh());
                        entry.into_value()
                    }
                    None => {
                        self.misses.inc();
                        return None;
                    }
                }
            };

            if entry.version >= version {
                return entry.resolution;
            }

            tracing::debug!(
                "Dropping attributes for [{}] computed against source version {} (now {})",
                key,
                entry.version,
                version
            );
            self.cache.invalidate(&key).await;
        }
    }

    #[inline]
    fn record(&self, fresh: bool) {
        if fresh {
            self.misses.inc();
        } else {
            self.hits.inc();
        }
    }

    /// Peek without computing
    pub async fn get(&self, key: &PrincipalKey) -> Option<Resolution> {
        self.cache.get(key).await.map(|entry| entry.resolution)
    }

    /// Drop one principal
    pub async fn invalidate(&self, key: &PrincipalKey) {
        self.cache.invalidate(key).await;
    }

    /// Drop every principal
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Apply pending evictions and expirations now
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Get current size (approximate until pending tasks have run)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.cache.entry_count(),
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
