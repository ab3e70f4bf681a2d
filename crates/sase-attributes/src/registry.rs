//! Lock-free source registry with copy-on-write registration

use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::source::AttributeSource;

/// Priority used for sources registered without one (lowest precedence)
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Registered source with its precedence
#[derive(Clone)]
pub struct SourceDescriptor {
    /// Lower value = higher precedence
    pub priority: i32,
    /// Registration order, breaks priority ties
    pub sequence: u64,
    /// Source handle
    pub source: Arc<dyn AttributeSource>,
}

impl SourceDescriptor {
    pub fn name(&self) -> &str {
        self.source.name()
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.source.name())
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Ordered collection of attribute sources
///
/// Readers take a snapshot without locking; registration publishes a new
/// sorted list. Fan-outs already running keep the list they started with.
/// The version moves forward after every published list, so a reader that
/// loads the version first and the list second never sees a list older than
/// that version.
pub struct SourceRegistry {
    /// Sources sorted by (priority, sequence)
    sources: ArcSwap<Vec<SourceDescriptor>>,
    next_sequence: AtomicU64,
    version: AtomicU64,
}

impl SourceRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            sources: ArcSwap::from_pointee(Vec::new()),
            next_sequence: AtomicU64::new(0),
            version: AtomicU64::new(0),
        }
    }

    /// Register a source, returning its registration sequence
    pub fn register(&self, priority: i32, source: Arc<dyn AttributeSource>) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::AcqRel);
        let descriptor = SourceDescriptor {
            priority,
            sequence,
            source,
        };

        tracing::debug!(
            "Registering attribute source [{}] with priority {}",
            descriptor.name(),
            priority
        );

        self.sources.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(descriptor.clone());
            next.sort_by_key(|d| (d.priority, d.sequence));
            next
        });
        self.version.fetch_add(1, Ordering::Release);

        sequence
    }

    /// Get current version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Sources in precedence order
    #[inline]
    pub fn ordered_sources(&self) -> Arc<Vec<SourceDescriptor>> {
        self.sources.load_full()
    }

    /// Source names in precedence order
    pub fn names(&self) -> Vec<String> {
        self.sources.load().iter().map(|d| d.name().to_string()).collect()
    }

    /// Get number of sources
    pub fn len(&self) -> usize {
        self.sources.load().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sources.load().is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
