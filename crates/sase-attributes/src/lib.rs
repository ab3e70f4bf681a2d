//! Principal Attribute Resolution
//!
//! One consistent attribute view per principal, assembled from any number of
//! backing stores.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  AttributeRepository::resolve                │
//! │                                                              │
//! │  ┌─────────────┐  Miss   ┌──────────────┐        ┌────────┐  │
//! │  │ Resolution  │───────►│   Fan-out     │──────►│ Merge  │  │
//! │  │ Cache (moka)│         │ (by priority) │        │ Engine │  │
//! │  └─────────────┘         └──────────────┘        └────────┘  │
//! │        │ Hit                   │                      │      │
//! │        ▼                 ┌─────┴─────┐                ▼      │
//! │  [AttributeMap]          │ S1 S2 … Sn│         [AttributeMap]│
//! │                          └───────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sources that fail are logged and skipped; the rest still answer.

#![warn(clippy::all)]

pub mod builder;
pub mod cache;
pub mod config;
pub mod fanout;
pub mod merge;
pub mod registry;
pub mod repository;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::AttributeRepositoryBuilder;
pub use cache::{CacheSettings, CacheStats, Resolution, ResolutionCache, Versioned};
pub use config::{RepositoryConfig, RepositorySettings, SourceConfig};
pub use fanout::{FanOut, FanOutResult, SourceStats};
pub use merge::{MergeEngine, MergePolicy};
pub use registry::{SourceDescriptor, SourceRegistry, LOWEST_PRECEDENCE};
pub use repository::{AttributeRepository, RepositoryStats};
pub use source::{
    AttributeSource, BlockingAttributeSource, JsonAttributeSource, SourceError, SourceResult,
    StaticAttributeSource,
};

pub use sase_common::{
    AttributeError, AttributeMap, AttributeResult, AttributeValue, CaseCanonicalization, PrincipalKey,
};
