//! Adapter for synchronous lookups
//!
//! Directory and database clients are often blocking. Wrapping them here
//! moves each lookup onto tokio's bounded blocking pool so a slow backend does
//! not stall the async workers serving other principals.

use async_trait::async_trait;
use sase_common::PrincipalKey;
use std::sync::Arc;

use super::{AttributeSource, SourceError, SourceResult};

/// Runs a blocking lookup function on the blocking thread pool
pub struct BlockingAttributeSource<F> {
    name: String,
    lookup: Arc<F>,
}

impl<F> BlockingAttributeSource<F>
where
    F: Fn(&PrincipalKey) -> SourceResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, lookup: F) -> Self {
        Self {
            name: name.into(),
            lookup: Arc::new(lookup),
        }
    }
}

#[async_trait]
impl<F> AttributeSource for BlockingAttributeSource<F>
where
    F: Fn(&PrincipalKey) -> SourceResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, principal: &PrincipalKey) -> SourceResult {
        let lookup = Arc::clone(&self.lookup);
        let principal = principal.clone();

        tokio::task::spawn_blocking(move || lookup(&principal))
            .await
            .map_err(|e| SourceError::Other(format!("blocking lookup aborted: {}", e)))?
    }
}
