//! Attribute repository facade

use sase_common::{AtomicCounter, AttributeResult, CaseCanonicalization, PrincipalKey, Timestamp};
use serde::Serialize;
use std::sync::Arc;

use crate::builder::AttributeRepositoryBuilder;
use crate::cache::{CacheStats, Resolution, ResolutionCache, Versioned};
use crate::config::RepositorySettings;
use crate::fanout::{FanOut, SourceStats};
use crate::merge::MergeEngine;
use crate::registry::SourceRegistry;
use crate::source::AttributeSource;

/// Merged, cached view over every registered attribute source
///
/// # Lookup path
///
/// - Cache hit: no source is touched
/// - Miss: all sources queried, merged in precedence order, then cached
/// - Concurrent misses for one principal share a single fan-out
/// - Results computed before a source was registered are never served after it
pub struct AttributeRepository {
    registry: Arc<SourceRegistry>,
    fanout: FanOut,
    merger: MergeEngine,
    cache: ResolutionCache,
    settings: RepositorySettings,

    // Metrics
    resolutions: AtomicCounter,
    fan_outs: AtomicCounter,
    no_matches: AtomicCounter,
}

impl AttributeRepository {
    /// Create repository over an existing registry
    pub fn new(settings: RepositorySettings, registry: Arc<SourceRegistry>) -> AttributeResult<Self> {
        settings.check()?;

        Ok(Self {
            registry,
            fanout: FanOut::new(settings.max_concurrent_queries),
            merger: MergeEngine::new(settings.merge_policy)
                .treat_empty_as_absent(settings.treat_empty_values_as_absent),
            cache: ResolutionCache::new(settings.cache),
            settings,
            resolutions: AtomicCounter::new(0),
            fan_outs: AtomicCounter::new(0),
            no_matches: AtomicCounter::new(0),
        })
    }

    /// Start a builder
    pub fn builder(settings: RepositorySettings) -> AttributeRepositoryBuilder {
        AttributeRepositoryBuilder::new(settings)
    }

    /// Canonical key for a raw principal identifier
    pub fn principal_key(&self, principal: &str) -> PrincipalKey {
        PrincipalKey::new(principal, self.settings.case_canonicalization)
    }

    /// Resolve attributes for a principal; `None` when no source knows it
    pub async fn resolve(&self, principal: &str) -> Resolution {
        self.resolve_key(self.principal_key(principal)).await
    }

    /// Resolve attributes for an already canonical key
    pub async fn resolve_key(&self, key: PrincipalKey) -> Resolution {
        self.resolutions.inc();
        let start = Timestamp::now();

        let version = self.registry.version();
        let miss_key = key.clone();
        let resolved = self
            .cache
            .get_or_resolve(key.clone(), version, move || self.compute(miss_key.clone()))
            .await;

        tracing::trace!(
            "Resolved [{}] in {}us: {}",
            key,
            start.elapsed_micros(),
            resolved.as_ref().map_or(0, |attrs| attrs.len())
        );
        resolved
    }

    async fn compute(&self, key: PrincipalKey) -> Versioned {
        self.fan_outs.inc();

        // version before sources: the list is never older than the stamp
        let version = self.registry.version();
        let sources = self.registry.ordered_sources();
        if sources.is_empty() {
            tracing::debug!("No attribute repository sources are available to resolve [{}]", key);
        }

        let result = self.fanout.query_all(&sources, &key).await;
        if result.is_no_match() {
            self.no_matches.inc();
            tracing::debug!("No attribute source has data for [{}]", key);
            return Versioned::new(version, None);
        }

        Versioned::new(version, Some(Arc::new(self.merger.merge(&result.attribute_maps()))))
    }

    /// Register a source at runtime
    ///
    /// Cached results predate the new source and are dropped. A fan-out
    /// already running is stamped with the old source version, so its result
    /// is recomputed by the next caller instead of being served.
    pub fn register(&self, priority: i32, source: Arc<dyn AttributeSource>) {
        self.registry.register(priority, source);
        self.cache.invalidate_all();
    }

    /// Drop cached attributes for one principal
    pub async fn invalidate(&self, principal: &str) {
        self.cache.invalidate(&self.principal_key(principal)).await;
    }

    /// Drop all cached attributes
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    pub fn canonicalization(&self) -> CaseCanonicalization {
        self.settings.case_canonicalization
    }

    /// Get repository statistics
    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            resolutions: self.resolutions.get(),
            fan_outs: self.fan_outs.get(),
            no_matches: self.no_matches.get(),
            cache: self.cache.stats(),
            sources: self.fanout.source_stats(),
        }
    }
}

/// Repository statistics
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryStats {
    pub resolutions: u64,
    pub fan_outs: u64,
    pub no_matches: u64,
    pub cache: CacheStats,
    pub sources: Vec<SourceStats>,
}
