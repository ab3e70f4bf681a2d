//! Multi-source fan-out
//!
//! Queries every registered source for one principal. Sources run
//! concurrently up to a fixed number of in-flight queries, but results are
//! always reassembled in precedence order so merging never depends on which
//! backend answered first.

use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::FutureExt;
use sase_common::{AtomicCounter, AttributeMap, PrincipalKey};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use tokio::sync::Semaphore;

use crate::registry::SourceDescriptor;
use crate::source::{SourceError, SourceResult};

/// Attributes returned by one source
#[derive(Debug, Clone)]
pub struct Contribution {
    pub source: String,
    pub priority: i32,
    pub attributes: AttributeMap,
}

/// Source that failed during a fan-out
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: String,
    pub error: SourceError,
}

/// Outcome of querying every source for one principal
#[derive(Debug, Default)]
pub struct FanOutResult {
    /// Contributions in precedence order
    pub contributions: Vec<Contribution>,
    /// Failed sources, already logged
    pub failures: Vec<SourceFailure>,
    /// Sources that had nothing for the principal
    pub no_matches: usize,
}

impl FanOutResult {
    /// True when no source contributed anything
    pub fn is_no_match(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Contributed maps, highest precedence first
    pub fn attribute_maps(&self) -> Vec<&AttributeMap> {
        self.contributions.iter().map(|c| &c.attributes).collect()
    }
}

#[derive(Debug, Default)]
struct SourceCounters {
    name: String,
    queries: AtomicCounter,
    hits: AtomicCounter,
    misses: AtomicCounter,
    failures: AtomicCounter,
}

/// Per-source query statistics
///
/// Keyed by registration sequence, so sources sharing a name are counted apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub sequence: u64,
    pub queries: u64,
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

/// Fan-out executor with bounded query concurrency
pub struct FanOut {
    permits: Semaphore,
    stats: DashMap<u64, SourceCounters>,
}

impl FanOut {
    /// Create executor allowing `max_concurrent_queries` source queries at once
    ///
    /// The limit is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(max_concurrent_queries: usize) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent_queries.clamp(1, Semaphore::MAX_PERMITS)),
            stats: DashMap::new(),
        }
    }

    /// Query every source for `principal`
    pub async fn query_all(&self, sources: &[SourceDescriptor], principal: &PrincipalKey) -> FanOutResult {
        let outcomes = join_all(sources.iter().map(|d| self.query_one(d, principal))).await;

        let mut result = FanOutResult::default();
        for (descriptor, outcome) in sources.iter().zip(outcomes) {
            let name = descriptor.name();
            let counters = self
                .stats
                .entry(descriptor.sequence)
                .or_insert_with(|| SourceCounters {
                    name: name.to_string(),
                    ..SourceCounters::default()
                });
            counters.queries.inc();

            match outcome {
                Ok(Some(attributes)) => {
                    counters.hits.inc();
                    result.contributions.push(Contribution {
                        source: name.to_string(),
                        priority: descriptor.priority,
                        attributes,
                    });
                }
                Ok(None) => {
                    counters.misses.inc();
                    result.no_matches += 1;
                }
                Err(error) => {
                    counters.failures.inc();
                    tracing::warn!(
                        "Attribute source [{}] failed for principal [{}]: {}",
                        name,
                        principal,
                        error
                    );
                    result.failures.push(SourceFailure {
                        source: name.to_string(),
                        error,
                    });
                }
            }
        }

        tracing::trace!(
            "Fan-out for [{}]: {} contribution(s), {} no-match, {} failure(s)",
            principal,
            result.contributions.len(),
            result.no_matches,
            result.failures.len()
        );
        result
    }

    async fn query_one(&self, descriptor: &SourceDescriptor, principal: &PrincipalKey) -> SourceResult {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SourceError::Unavailable("query pool closed".into()))?;

        AssertUnwindSafe(descriptor.source.query(principal))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(SourceError::Other("source panicked".into())))
    }

    /// Snapshot of per-source statistics in registration order
    pub fn source_stats(&self) -> Vec<SourceStats> {
        let mut stats: Vec<_> = self
            .stats
            .iter()
            .map(|entry| SourceStats {
                source: entry.name.clone(),
                sequence: *entry.key(),
                queries: entry.queries.get(),
                hits: entry.hits.get(),
                misses: entry.misses.get(),
                failures: entry.failures.get(),
            })
            .collect();
        stats.sort_by_key(|s| s.sequence);
        stats
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(16)
    }
}
