//! Attribute source contract
//!
//! Every backing store (directory, relational, scripted, group, static) is
//! reached through [`AttributeSource`]. Drivers for concrete stores live
//! outside this crate; the built-in sources cover static and file-backed data
//! plus an adapter for blocking lookups.

mod blocking;
mod json;
mod stub;

pub use blocking::BlockingAttributeSource;
pub use json::JsonAttributeSource;
pub use stub::StaticAttributeSource;

use async_trait::async_trait;
use sase_common::{AttributeMap, PrincipalKey};
use std::time::Duration;

/// Source failure
///
/// Absorbed by the fan-out: the failing source contributes nothing and every
/// other source still runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("source timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

/// Result of one source query: `Ok(None)` is a no-match, not a failure
pub type SourceResult = Result<Option<AttributeMap>, SourceError>;

/// Attribute source trait
#[async_trait]
pub trait AttributeSource: Send + Sync {
    /// Name used in logs and statistics
    fn name(&self) -> &str;

    /// Look up attributes for a principal
    async fn query(&self, principal: &PrincipalKey) -> SourceResult;
}
