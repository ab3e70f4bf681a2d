//! JSON-backed attribute source
//!
//! Document shape:
//!
//! ```json
//! {
//!   "casuser": { "email": "casuser@example.org", "memberOf": ["staff", "faculty"] },
//!   "alice":   { "email": ["alice@example.org"] }
//! }
//! ```

use arc_swap::ArcSwap;
use async_trait::async_trait;
use sase_common::{AttributeError, AttributeMap, AttributeResult, PrincipalKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AttributeSource, SourceResult};

type Entries = HashMap<String, AttributeMap>;

/// Per-principal attributes loaded from a JSON document
pub struct JsonAttributeSource {
    name: String,
    location: Option<PathBuf>,
    /// Current document (atomically swappable on reload)
    entries: ArcSwap<Entries>,
}

impl JsonAttributeSource {
    /// Load from file
    pub fn from_path(path: impl AsRef<Path>) -> AttributeResult<Self> {
        let path = path.as_ref();
        let entries = Self::read(path)?;
        tracing::debug!(
            "Loaded JSON attribute source from [{}] with {} principal(s)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            name: format!("json:{}", path.display()),
            location: Some(path.to_path_buf()),
            entries: ArcSwap::from_pointee(entries),
        })
    }

    /// Parse from an in-memory document
    pub fn from_json_str(name: impl Into<String>, document: &str) -> AttributeResult<Self> {
        let entries: Entries = serde_json::from_str(document)?;
        Ok(Self {
            name: name.into(),
            location: None,
            entries: ArcSwap::from_pointee(entries),
        })
    }

    /// Re-read the backing file, returning the number of principals loaded
    ///
    /// In-flight queries keep the document they started with.
    pub fn reload(&self) -> AttributeResult<usize> {
        let path = self.location.as_deref().ok_or_else(|| {
            AttributeError::Config(format!("source [{}] has no backing file to reload", self.name))
        })?;
        let entries = Self::read(path)?;
        let count = entries.len();
        self.entries.store(Arc::new(entries));
        tracing::debug!("Reloaded JSON attribute source [{}] with {} principal(s)", self.name, count);
        Ok(count)
    }

    /// Number of principals in the current document
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    fn read(path: &Path) -> AttributeResult<Entries> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl AttributeSource for JsonAttributeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, principal: &PrincipalKey) -> SourceResult {
        Ok(self.entries.load().get(principal.as_str()).cloned())
    }
}
