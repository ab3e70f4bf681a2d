//! Startup wiring from configuration to a ready repository

use sase_common::AttributeResult;
use std::sync::Arc;

use crate::config::{RepositoryConfig, RepositorySettings, SourceConfig};
use crate::registry::SourceRegistry;
use crate::repository::AttributeRepository;
use crate::source::{AttributeSource, JsonAttributeSource, StaticAttributeSource};

/// Collects sources and settings, then builds an [`AttributeRepository`]
pub struct AttributeRepositoryBuilder {
    settings: RepositorySettings,
    registry: SourceRegistry,
}

impl AttributeRepositoryBuilder {
    pub fn new(settings: RepositorySettings) -> Self {
        Self {
            settings,
            registry: SourceRegistry::new(),
        }
    }

    /// Validate a configuration and instantiate its declared sources
    pub fn from_config(config: &RepositoryConfig) -> AttributeResult<Self> {
        let settings = config.validate()?;
        Self::new(settings).sources_from_config(&config.sources)
    }

    /// Add a source
    pub fn source(self, priority: i32, source: Arc<dyn AttributeSource>) -> Self {
        self.registry.register(priority, source);
        self
    }

    /// Instantiate declared sources
    ///
    /// A static source with no attributes would match every principal with
    /// an empty map, so it is skipped.
    pub fn sources_from_config(self, sources: &[SourceConfig]) -> AttributeResult<Self> {
        for declared in sources {
            let source: Arc<dyn AttributeSource> = match declared {
                SourceConfig::Static { name, attributes, .. } if attributes.is_empty() => {
                    tracing::info!("Static attribute source [{}] defines no attributes and is skipped", name);
                    continue;
                }
                SourceConfig::Static { name, attributes, .. } => {
                    tracing::info!(
                        "Found and added static attributes {:?} to the list of candidate attribute sources",
                        attributes.names().collect::<Vec<_>>()
                    );
                    Arc::new(StaticAttributeSource::new(name.clone(), attributes.clone()))
                }
                SourceConfig::Json { location, .. } => {
                    tracing::debug!("Configured JSON attribute source from [{}]", location.display());
                    Arc::new(JsonAttributeSource::from_path(location)?)
                }
            };
            self.registry.register(declared.priority(), source);
        }
        Ok(self)
    }

    /// Build the repository, refusing invalid settings
    pub fn build(self) -> AttributeResult<AttributeRepository> {
        if self.registry.is_empty() {
            tracing::debug!("No attribute repository sources are available/defined to merge together");
        } else {
            tracing::debug!(
                "Configured attribute repository sources to merge together: {:?}",
                self.registry.names()
            );
            tracing::debug!(
                "Configured cache expiration policy for merged attributes to be {:?}",
                self.settings.cache.time_to_live
            );
        }

        AttributeRepository::new(self.settings, Arc::new(self.registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sase_common::{AttributeError, AttributeValue};

    #[tokio::test]
    async fn test_build_from_config() {
        let path = std::env::temp_dir().join(format!("sase-attributes-builder-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "casuser": { "email": "casuser@example.org" } }"#).unwrap();

        let config = RepositoryConfig::from_toml_str(&format!(
            r#"
merger = "merge"

[[sources]]
type = "static"
name = "defaults"
[sources.attributes]
email = "shared@example.org"
affiliation = "member"

[[sources]]
type = "json"
priority = 1
location = "{}"
"#,
            path.display().to_string().replace('\\', "\\\\")
        ))
        .unwrap();

        let repo = AttributeRepositoryBuilder::from_config(&config).unwrap().build().unwrap();
        assert_eq!(repo.registry().names()[1], "defaults");

        let attrs = repo.resolve("casuser").await.unwrap();
        assert_eq!(
            attrs.get("email").unwrap(),
            &[
                AttributeValue::from("casuser@example.org"),
                AttributeValue::from("shared@example.org")
            ]
        );
        assert_eq!(attrs.get("affiliation").unwrap(), &[AttributeValue::from("member")]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_static_source_without_attributes_is_skipped() {
        let config = RepositoryConfig::from_toml_str(
            "[[sources]]\ntype = \"static\"\n[sources.attributes]\n",
        )
        .unwrap();

        let repo = AttributeRepositoryBuilder::from_config(&config).unwrap().build().unwrap();
        assert!(repo.registry().is_empty());
        assert!(repo.resolve("ghost").await.is_none());
    }

    #[test]
    fn test_missing_json_source_fails_startup() {
        let config = RepositoryConfig::from_toml_str(
            "[[sources]]\ntype = \"json\"\nlocation = \"/nonexistent/people.json\"\n",
        )
        .unwrap();
        assert!(matches!(
            AttributeRepositoryBuilder::from_config(&config).err(),
            Some(AttributeError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = RepositoryConfig::from_toml_str("merger = \"overwrite\"").unwrap();
        assert!(AttributeRepositoryBuilder::from_config(&config).is_err());
    }
}
