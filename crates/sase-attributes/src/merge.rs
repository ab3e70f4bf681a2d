//! Attribute merge engine
//!
//! Folds per-source attribute maps (highest precedence first) into one map.
//! The policy is chosen once per deployment:
//!
//! | Policy    | Same name from several sources                         |
//! |-----------|--------------------------------------------------------|
//! | `replace` | highest-precedence values replace everything below     |
//! | `merge`   | union of all values, duplicates removed, order kept    |
//! | `add`     | first definition sticks, later ones are dropped        |

use sase_common::{AttributeError, AttributeMap, AttributeValues};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Conflict policy for attributes defined by more than one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Higher-precedence sources overwrite lower ones
    #[default]
    Replace,
    /// Multi-valued union
    Merge,
    /// Non-colliding add
    Add,
}

impl FromStr for MergePolicy {
    type Err = AttributeError;

    /// Blank selects the default (`replace`); anything unknown is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "replace" => Ok(Self::Replace),
            "merge" => Ok(Self::Merge),
            "add" => Ok(Self::Add),
            other => Err(AttributeError::UnknownMergePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Replace => "replace",
            Self::Merge => "merge",
            Self::Add => "add",
        };
        f.write_str(name)
    }
}

/// Stateless merge engine
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    policy: MergePolicy,
    /// Names with no values are treated as undefined
    treat_empty_as_absent: bool,
}

impl MergeEngine {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            treat_empty_as_absent: false,
        }
    }

    /// Treat names mapped to an empty value set as not defined
    pub fn treat_empty_as_absent(mut self, enabled: bool) -> Self {
        self.treat_empty_as_absent = enabled;
        self
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Merge maps given in precedence order (highest first)
    pub fn merge<M: Borrow<AttributeMap>>(&self, maps: &[M]) -> AttributeMap {
        match self.policy {
            MergePolicy::Replace => self.replace(maps),
            MergePolicy::Merge => self.union(maps),
            MergePolicy::Add => self.add(maps),
        }
    }

    #[inline]
    fn defines(&self, values: &AttributeValues) -> bool {
        !(self.treat_empty_as_absent && values.is_empty())
    }

    /// Lowest precedence first, each source overwriting what came before
    fn replace<M: Borrow<AttributeMap>>(&self, maps: &[M]) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for map in maps.iter().rev() {
            let map: &AttributeMap = map.borrow();
            for (name, values) in map {
                if self.defines(values) {
                    merged.insert(name.clone(), values.clone());
                }
            }
        }
        merged
    }

    /// Highest precedence first, names already present are never touched
    fn add<M: Borrow<AttributeMap>>(&self, maps: &[M]) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for map in maps {
            let map: &AttributeMap = map.borrow();
            for (name, values) in map {
                if self.defines(values) {
                    merged.entry(name.clone()).or_insert_with(|| values.clone());
                }
            }
        }
        merged
    }

    fn union<M: Borrow<AttributeMap>>(&self, maps: &[M]) -> AttributeMap {
        let mut merged = AttributeMap::new();
        for map in maps {
            let map: &AttributeMap = map.borrow();
            for (name, values) in map {
                if !self.defines(values) {
                    continue;
                }
                let slot = merged.entry(name.clone()).or_default();
                for value in values {
                    if !slot.contains(value) {
                        slot.push(value.clone());
                    }
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sase_common::AttributeValue;

    fn ldap() -> AttributeMap {
        AttributeMap::new()
            .with("email", ["alice@ldap.example.org"])
            .with("memberOf", ["staff", "faculty"])
    }

    fn jdbc() -> AttributeMap {
        AttributeMap::new()
            .with("email", ["alice@db.example.org"])
            .with("memberOf", ["staff", "alumni"])
            .with("phone", ["555-0100"])
    }

    fn text(values: &[&str]) -> Vec<AttributeValue> {
        values.iter().map(|v| AttributeValue::from(*v)).collect()
    }

    #[test]
    fn test_replace_first_source_wins() {
        let merged = MergeEngine::new(MergePolicy::Replace).merge(&[ldap(), jdbc()]);

        assert_eq!(merged.get("email").unwrap(), text(&["alice@ldap.example.org"]).as_slice());
        assert_eq!(merged.get("memberOf").unwrap(), text(&["staff", "faculty"]).as_slice());
        assert_eq!(merged.get("phone").unwrap(), text(&["555-0100"]).as_slice());
    }

    #[test]
    fn test_add_first_definition_sticks() {
        let merged = MergeEngine::new(MergePolicy::Add).merge(&[ldap(), jdbc()]);

        assert_eq!(merged.get("email").unwrap(), text(&["alice@ldap.example.org"]).as_slice());
        assert_eq!(merged.get("memberOf").unwrap(), text(&["staff", "faculty"]).as_slice());
        assert_eq!(merged.get("phone").unwrap(), text(&["555-0100"]).as_slice());
    }

    #[test]
    fn test_merge_unions_in_priority_order() {
        let merged = MergeEngine::new(MergePolicy::Merge).merge(&[ldap(), jdbc()]);

        assert_eq!(
            merged.get("email").unwrap(),
            text(&["alice@ldap.example.org", "alice@db.example.org"]).as_slice()
        );
        assert_eq!(
            merged.get("memberOf").unwrap(),
            text(&["staff", "faculty", "alumni"]).as_slice()
        );
    }

    #[test]
    fn test_merge_removes_duplicates_within_a_source() {
        let dup = AttributeMap::new().with("memberOf", ["staff", "staff", "admins"]);
        let merged = MergeEngine::new(MergePolicy::Merge).merge(&[dup]);
        assert_eq!(merged.get("memberOf").unwrap(), text(&["staff", "admins"]).as_slice());
    }

    #[test]
    fn test_empty_values_define_the_name() {
        let first = AttributeMap::new().with("email", Vec::<&str>::new());
        let second = AttributeMap::new().with("email", ["a@x"]);

        for policy in [MergePolicy::Replace, MergePolicy::Add] {
            let merged = MergeEngine::new(policy).merge(&[&first, &second]);
            assert!(merged.get("email").unwrap().is_empty(), "{}", policy);
        }

        let merged = MergeEngine::new(MergePolicy::Merge).merge(&[&first, &second]);
        assert_eq!(merged.get("email").unwrap(), text(&["a@x"]).as_slice());
    }

    #[test]
    fn test_empty_values_treated_as_absent() {
        let first = AttributeMap::new().with("email", Vec::<&str>::new()).with("cn", Vec::<&str>::new());
        let second = AttributeMap::new().with("email", ["a@x"]);

        for policy in [MergePolicy::Replace, MergePolicy::Add, MergePolicy::Merge] {
            let merged = MergeEngine::new(policy)
                .treat_empty_as_absent(true)
                .merge(&[&first, &second]);
            assert_eq!(merged.get("email").unwrap(), text(&["a@x"]).as_slice(), "{}", policy);
            assert!(!merged.contains("cn"), "{}", policy);
        }
    }

    #[test]
    fn test_no_maps_yields_empty() {
        let maps: [AttributeMap; 0] = [];
        assert!(MergeEngine::default().merge(&maps).is_empty());
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("".parse::<MergePolicy>().unwrap(), MergePolicy::Replace);
        assert_eq!(" Merge ".parse::<MergePolicy>().unwrap(), MergePolicy::Merge);
        assert_eq!("ADD".parse::<MergePolicy>().unwrap(), MergePolicy::Add);
        assert!(matches!(
            "overwrite".parse::<MergePolicy>(),
            Err(AttributeError::UnknownMergePolicy(_))
        ));
        assert_eq!(MergePolicy::default().to_string(), "replace");
    }

    fn arb_map() -> impl Strategy<Value = AttributeMap> {
        prop::collection::btree_map(
            "[a-e]",
            prop::collection::vec("[a-c]{1,2}".prop_map(AttributeValue::Text), 0..4),
            0..5,
        )
        .prop_map(|m| m.into_iter().collect())
    }

    fn arb_policy() -> impl Strategy<Value = MergePolicy> {
        prop_oneof![Just(MergePolicy::Replace), Just(MergePolicy::Merge), Just(MergePolicy::Add)]
    }

    proptest! {
        #[test]
        fn prop_merge_is_deterministic(maps in prop::collection::vec(arb_map(), 0..5), policy in arb_policy()) {
            let engine = MergeEngine::new(policy);
            let first = serde_json::to_vec(&engine.merge(&maps)).unwrap();
            let second = serde_json::to_vec(&engine.merge(&maps)).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_replace_and_add_agree(maps in prop::collection::vec(arb_map(), 0..5)) {
            prop_assert_eq!(
                MergeEngine::new(MergePolicy::Replace).merge(&maps),
                MergeEngine::new(MergePolicy::Add).merge(&maps)
            );
        }

        #[test]
        fn prop_merge_covers_every_name(maps in prop::collection::vec(arb_map(), 0..5), policy in arb_policy()) {
            let merged = MergeEngine::new(policy).merge(&maps);
            for map in &maps {
                for name in map.names() {
                    prop_assert!(merged.contains(name));
                }
            }
        }
    }
}
