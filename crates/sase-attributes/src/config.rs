//! Attribute repository configuration

use sase_common::{AttributeError, AttributeMap, AttributeResult, CaseCanonicalization};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::cache::CacheSettings;
use crate::merge::MergePolicy;
use crate::registry::LOWEST_PRECEDENCE;

/// Repository configuration as written by operators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Merge policy name (`replace`, `merge`, `add`); blank means `replace`
    pub merger: Option<String>,
    /// Maximum cached principals
    pub maximum_cache_size: u64,
    /// Cache time-to-live in minutes
    pub expire_in_minutes: u64,
    /// Cache principals no source knows about
    pub cache_null_results: bool,
    /// Principal identifier canonicalization
    pub case_canonicalization: CaseCanonicalization,
    /// Ignore attribute names that carry no values
    pub treat_empty_values_as_absent: bool,
    /// Source queries allowed in flight at once
    pub max_concurrent_queries: usize,
    /// Declared sources
    pub sources: Vec<SourceConfig>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            merger: None,
            maximum_cache_size: 10_000,
            expire_in_minutes: 30,
            cache_null_results: false,
            case_canonicalization: CaseCanonicalization::None,
            treat_empty_values_as_absent: false,
            max_concurrent_queries: 16,
            sources: Vec::new(),
        }
    }
}

impl RepositoryConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> AttributeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> AttributeResult<Self> {
        toml::from_str(content).map_err(|e| AttributeError::Parse(e.to_string()))
    }

    /// Check values and resolve them into settings
    pub fn validate(&self) -> AttributeResult<RepositorySettings> {
        let merge_policy = match self.merger.as_deref() {
            Some(name) => name.parse()?,
            None => MergePolicy::default(),
        };
        tracing::debug!("Configured merging strategy for attribute sources is [{}]", merge_policy);

        let settings = RepositorySettings {
            merge_policy,
            cache: CacheSettings {
                maximum_size: self.maximum_cache_size,
                time_to_live: Duration::from_secs(self.expire_in_minutes.saturating_mul(60)),
                cache_null_results: self.cache_null_results,
            },
            case_canonicalization: self.case_canonicalization,
            treat_empty_values_as_absent: self.treat_empty_values_as_absent,
            max_concurrent_queries: self.max_concurrent_queries,
        };
        settings.check()?;
        Ok(settings)
    }
}

/// Declared attribute source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Same attributes for every principal
    Static {
        #[serde(default = "default_static_name")]
        name: String,
        #[serde(default = "lowest_precedence")]
        priority: i32,
        attributes: AttributeMap,
    },
    /// Per-principal attributes from a JSON document
    Json {
        #[serde(default = "lowest_precedence")]
        priority: i32,
        location: PathBuf,
    },
}

impl SourceConfig {
    pub fn priority(&self) -> i32 {
        match self {
            Self::Static { priority, .. } | Self::Json { priority, .. } => *priority,
        }
    }
}

fn lowest_precedence() -> i32 {
    LOWEST_PRECEDENCE
}

fn default_static_name() -> String {
    "static".to_string()
}

/// Longest accepted cache time-to-live (100 years)
pub const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Validated repository settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositorySettings {
    pub merge_policy: MergePolicy,
    pub cache: CacheSettings,
    pub case_canonicalization: CaseCanonicalization,
    pub treat_empty_values_as_absent: bool,
    pub max_concurrent_queries: usize,
}

impl RepositorySettings {
    /// Reject values the repository cannot run with
    pub fn check(&self) -> AttributeResult<()> {
        if self.cache.maximum_size == 0 {
            return Err(AttributeError::Config("maximum cache size must be positive".into()));
        }
        if self.cache.time_to_live.is_zero() {
            return Err(AttributeError::Config("cache expiration must be positive".into()));
        }
        if self.cache.time_to_live > MAX_TIME_TO_LIVE {
            return Err(AttributeError::Config(format!(
                "cache expiration {:?} exceeds the maximum of {:?}",
                self.cache.time_to_live, MAX_TIME_TO_LIVE
            )));
        }
        if self.max_concurrent_queries == 0 {
            return Err(AttributeError::Config("max concurrent queries must be positive".into()));
        }
        if self.max_concurrent_queries > Semaphore::MAX_PERMITS {
            return Err(AttributeError::Config(format!(
                "max concurrent queries {} exceeds the maximum of {}",
                self.max_concurrent_queries,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            cache: CacheSettings::default(),
            case_canonicalization: CaseCanonicalization::None,
            treat_empty_values_as_absent: false,
            max_concurrent_queries: 16,
        }
    }
}
