//! Principal keys
//!
//! A principal key identifies whose attributes are being resolved. Keys are
//! value objects: they are canonicalized once at construction and compared by
//! their canonical text, so two spellings of the same username share a cache
//! slot when the deployment canonicalizes case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::AttributeError;

/// Case canonicalization applied to principal identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseCanonicalization {
    /// Keep the identifier exactly as supplied
    #[default]
    None,
    /// Lower-case the identifier
    Lower,
    /// Upper-case the identifier
    Upper,
}

impl CaseCanonicalization {
    /// Apply this mode to a raw identifier
    pub fn apply<'a>(&self, raw: &'a str) -> std::borrow::Cow<'a, str> {
        match self {
            Self::None => std::borrow::Cow::Borrowed(raw),
            Self::Lower => std::borrow::Cow::Owned(raw.to_lowercase()),
            Self::Upper => std::borrow::Cow::Owned(raw.to_uppercase()),
        }
    }
}

impl FromStr for CaseCanonicalization {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "lower" => Ok(Self::Lower),
            "upper" => Ok(Self::Upper),
            other => Err(AttributeError::UnknownCanonicalization(other.to_string())),
        }
    }
}

/// Canonicalized principal identifier (Value Object)
///
/// Cheap to clone; the text is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalKey(Arc<str>);

impl PrincipalKey {
    /// Create a key, canonicalizing `raw` with `mode`
    ///
    /// Empty identifiers are accepted and handed to sources unchanged.
    pub fn new(raw: &str, mode: CaseCanonicalization) -> Self {
        Self(Arc::from(mode.apply(raw).as_ref()))
    }

    /// Create a key without canonicalization
    pub fn exact(raw: impl AsRef<str>) -> Self {
        Self(Arc::from(raw.as_ref()))
    }

    /// Get canonical text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check for an empty identifier
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PrincipalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PrincipalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalization_modes() {
        assert_eq!(PrincipalKey::new("CasUser", CaseCanonicalization::None).as_str(), "CasUser");
        assert_eq!(PrincipalKey::new("CasUser", CaseCanonicalization::Lower).as_str(), "casuser");
        assert_eq!(PrincipalKey::new("CasUser", CaseCanonicalization::Upper).as_str(), "CASUSER");
    }

    #[test]
    fn test_keys_equal_after_canonicalization() {
        let a = PrincipalKey::new("Alice", CaseCanonicalization::Lower);
        let b = PrincipalKey::new("ALICE", CaseCanonicalization::Lower);
        assert_eq!(a, b);

        let c = PrincipalKey::new("Alice", CaseCanonicalization::None);
        let d = PrincipalKey::new("ALICE", CaseCanonicalization::None);
        assert_ne!(c, d);
    }

    #[test]
    fn test_empty_key_passes_through() {
        let key = PrincipalKey::new("", CaseCanonicalization::Lower);
        assert!(key.is_empty());
        assert_eq!(key.to_string(), "");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("LOWER".parse::<CaseCanonicalization>().unwrap(), CaseCanonicalization::Lower);
        assert_eq!(" upper ".parse::<CaseCanonicalization>().unwrap(), CaseCanonicalization::Upper);
        assert_eq!("".parse::<CaseCanonicalization>().unwrap(), CaseCanonicalization::None);
        assert!("title".parse::<CaseCanonicalization>().is_err());
    }
}
