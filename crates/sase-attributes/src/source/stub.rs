//! Static attribute source

use async_trait::async_trait;
use sase_common::{AttributeMap, PrincipalKey};

use super::{AttributeSource, SourceResult};

/// Returns the same attributes for every principal
///
/// Used for deployment-wide defaults and for development setups without a
/// real directory.
#[derive(Debug, Clone)]
pub struct StaticAttributeSource {
    name: String,
    attributes: AttributeMap,
}

impl StaticAttributeSource {
    pub fn new(name: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

#[async_trait]
impl AttributeSource for StaticAttributeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _principal: &PrincipalKey) -> SourceResult {
        Ok(Some(self.attributes.clone()))
    }
}
