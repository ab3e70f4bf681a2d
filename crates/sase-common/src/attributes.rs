//! Attribute values and attribute maps
//!
//! An [`AttributeMap`] is what one source produces for one principal and also
//! the shape of the merged result. Names are kept sorted so two merges of the
//! same input produce identical output; the values of one name keep the order
//! the source produced them in.
//!
//! Floats make values only `PartialEq`. A JSON `null` carries no value and is
//! dropped on load, so `"phone": null` defines `phone` with an empty value set.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Single attribute value
///
/// Unsigned integers above `i64::MAX` load as `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Text value
    Text(String),
}

impl AttributeValue {
    /// Get text value if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Ordered values of one attribute from one source
pub type AttributeValues = Vec<AttributeValue>;

/// Attribute name to values mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, AttributeValues>);

impl AttributeMap {
    /// Create empty map
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with<V: Into<AttributeValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.insert(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Insert values for a name, returning the previous values
    pub fn insert(&mut self, name: impl Into<String>, values: AttributeValues) -> Option<AttributeValues> {
        self.0.insert(name.into(), values)
    }

    /// Get values for a name
    pub fn get(&self, name: &str) -> Option<&[AttributeValue]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Check whether a name is defined (possibly with no values)
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Remove a name
    pub fn remove(&mut self, name: &str) -> Option<AttributeValues> {
        self.0.remove(name)
    }

    /// Entry for in-place update
    pub fn entry(&mut self, name: String) -> btree_map::Entry<'_, String, AttributeValues> {
        self.0.entry(name)
    }

    /// Attribute names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate name and values
    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValues> {
        self.0.iter()
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop names whose value set is empty
    pub fn without_empty_values(mut self) -> Self {
        self.0.retain(|_, values| !values.is_empty());
        self
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, AttributeValues);
    type IntoIter = btree_map::IntoIter<String, AttributeValues>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = (&'a String, &'a AttributeValues);
    type IntoIter = btree_map::Iter<'a, String, AttributeValues>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, AttributeValues)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValues)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Documents may give a single value where a list is expected
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Option<AttributeValue>>),
    One(Option<AttributeValue>),
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(name, values)| match values {
                OneOrMany::Many(values) => (name, values.into_iter().flatten().collect()),
                OneOrMany::One(value) => (name, value.into_iter().collect()),
            })
            .collect())
    }
}
