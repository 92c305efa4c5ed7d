//! Dependency Specs and Wildcard Patterns
//!
//! A callback declares its inputs, state and outputs as specs: a property
//! name plus either an exact component id or an id pattern. Pattern keys
//! carry selectors:
//!
//! - a literal value, which must match exactly
//! - `ALL`, which accepts any value (multi-valued)
//! - `MATCH`, which accepts the value bound on the callback instance
//! - `ALLSMALLER`, which accepts any value smaller than the instance's
//!   `MATCH` binding for the same key (multi-valued)
//!
//! A pattern only ever matches keyed ids with exactly the same key set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::address::{Address, Bindings, ComponentId, KeyValue};

/// Selector for one key of an id pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Literal value.
    Value(KeyValue),
    /// Any value.
    All,
    /// The value bound on the instance.
    Match,
    /// Any value smaller than the value bound on the instance.
    AllSmaller,
}

impl Selector {
    /// Whether this selector reads an instance binding.
    pub fn needs_binding(&self) -> bool {
        matches!(self, Selector::Match | Selector::AllSmaller)
    }

    fn accepts(&self, key: &str, value: &KeyValue, bindings: &Bindings) -> bool {
        match self {
            Selector::Value(expected) => expected == value,
            Selector::All => true,
            Selector::Match => bindings.get(key) == Some(value),
            Selector::AllSmaller => bindings
                .get(key)
                .is_some_and(|bound| value.precedes(bound)),
        }
    }
}

/// Which components a spec addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdPattern {
    /// Exactly one component.
    Exact(ComponentId),
    /// Every keyed component whose keys satisfy the selectors.
    Wildcard(BTreeMap<String, Selector>),
}

/// A declared input, state or output of a callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySpec {
    /// The addressed component(s).
    pub target: IdPattern,
    /// The property on those components.
    pub property: String,
}

impl DependencySpec {
    /// Spec targeting a single component.
    pub fn exact(id: impl Into<ComponentId>, property: impl Into<String>) -> Self {
        Self {
            target: IdPattern::Exact(id.into()),
            property: property.into(),
        }
    }

    /// Spec targeting a wildcard pattern.
    pub fn pattern<K, I>(selectors: I, property: impl Into<String>) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Selector)>,
    {
        Self {
            target: IdPattern::Wildcard(
                selectors.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            ),
            property: property.into(),
        }
    }

    /// Whether the dependency can bind to a variable number of addresses.
    pub fn is_multi_valued(&self) -> bool {
        match &self.target {
            IdPattern::Exact(_) => false,
            IdPattern::Wildcard(selectors) => selectors
                .values()
                .any(|s| matches!(s, Selector::All | Selector::AllSmaller)),
        }
    }

    /// Pattern keys whose selector reads an instance binding.
    pub fn bound_keys(&self) -> impl Iterator<Item = &str> {
        let selectors = match &self.target {
            IdPattern::Exact(_) => None,
            IdPattern::Wildcard(selectors) => Some(selectors),
        };
        selectors
            .into_iter()
            .flatten()
            .filter(|(_, s)| s.needs_binding())
            .map(|(k, _)| k.as_str())
    }

    /// Pattern keys carrying a selector of the given kind.
    pub fn keys_with(&self, selector: &Selector) -> Vec<&str> {
        match &self.target {
            IdPattern::Exact(_) => Vec::new(),
            IdPattern::Wildcard(selectors) => selectors
                .iter()
                .filter(|(_, s)| *s == selector)
                .map(|(k, _)| k.as_str())
                .collect(),
        }
    }

    /// Whether the dependency addresses `component` under `bindings`.
    pub fn matches_component(&self, component: &ComponentId, bindings: &Bindings) -> bool {
        match (&self.target, component) {
            (IdPattern::Exact(id), _) => id == component,
            (IdPattern::Wildcard(selectors), ComponentId::Keyed(keys)) => {
                same_key_set(selectors, keys)
                    && selectors
                        .iter()
                        .all(|(k, s)| keys.get(k).is_some_and(|v| s.accepts(k, v, bindings)))
            }
            (IdPattern::Wildcard(_), ComponentId::Named(_)) => false,
        }
    }

    /// Whether the dependency addresses `address` under `bindings`.
    pub fn matches(&self, address: &Address, bindings: &Bindings) -> bool {
        self.property == address.property && self.matches_component(&address.component, bindings)
    }

    /// Capture the `MATCH` values a concrete component would bind.
    ///
    /// Returns `None` when the component cannot be addressed by this spec
    /// under any binding. `ALL` and `ALLSMALLER` keys accept any value and
    /// bind nothing.
    pub fn capture(&self, component: &ComponentId) -> Option<Bindings> {
        match (&self.target, component) {
            (IdPattern::Exact(id), _) => (id == component).then(Bindings::new),
            (IdPattern::Wildcard(selectors), ComponentId::Keyed(keys)) => {
                if !same_key_set(selectors, keys) {
                    return None;
                }
                let mut captured = Bindings::new();
                for (key, selector) in selectors {
                    let value = keys.get(key)?;
                    match selector {
                        Selector::Value(expected) if expected != value => return None,
                        Selector::Match => {
                            captured.insert(key.clone(), value.clone());
                        }
                        _ => {}
                    }
                }
                Some(captured)
            }
            (IdPattern::Wildcard(_), ComponentId::Named(_)) => None,
        }
    }

    /// Whether two specs can ever address the same property of the same
    /// component, ignoring instance bindings.
    pub fn may_overlap(&self, other: &DependencySpec) -> bool {
        if self.property != other.property {
            return false;
        }
        match (&self.target, &other.target) {
            (IdPattern::Exact(a), IdPattern::Exact(b)) => a == b,
            (IdPattern::Exact(id), IdPattern::Wildcard(selectors))
            | (IdPattern::Wildcard(selectors), IdPattern::Exact(id)) => match id {
                ComponentId::Named(_) => false,
                ComponentId::Keyed(keys) => {
                    same_key_set(selectors, keys)
                        && selectors.iter().all(|(k, s)| match s {
                            Selector::Value(v) => keys.get(k) == Some(v),
                            _ => true,
                        })
                }
            },
            (IdPattern::Wildcard(a), IdPattern::Wildcard(b)) => {
                same_key_set(a, b)
                    && a.iter().all(|(k, sa)| match (sa, b.get(k)) {
                        (Selector::Value(va), Some(Selector::Value(vb))) => va == vb,
                        _ => true,
                    })
            }
        }
    }
}

fn same_key_set<A, B>(a: &BTreeMap<String, A>, b: &BTreeMap<String, B>) -> bool {
    a.len() == b.len() && a.keys().zip(b.keys()).all(|(x, y)| x == y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: i64) -> ComponentId {
        ComponentId::keyed([("type", KeyValue::from("item")), ("index", KeyValue::from(index))])
    }

    fn item_spec(index: Selector) -> DependencySpec {
        DependencySpec::pattern(
            [("type", Selector::Value(KeyValue::from("item"))), ("index", index)],
            "value",
        )
    }

    #[test]
    fn multi_valued_flags() {
        assert!(!DependencySpec::exact("a", "value").is_multi_valued());
        assert!(!item_spec(Selector::Match).is_multi_valued());
        assert!(item_spec(Selector::All).is_multi_valued());
        assert!(item_spec(Selector::AllSmaller).is_multi_valued());
    }

    #[test]
    fn match_uses_instance_binding() {
        let spec = item_spec(Selector::Match);
        let bindings = Bindings::from([("index".to_string(), KeyValue::from(2))]);

        assert!(spec.matches_component(&item(2), &bindings));
        assert!(!spec.matches_component(&item(3), &bindings));
        assert!(!spec.matches_component(&item(2), &Bindings::new()));
    }

    #[test]
    fn all_smaller_accepts_values_below_binding() {
        let spec = item_spec(Selector::AllSmaller);
        let bindings = Bindings::from([("index".to_string(), KeyValue::from(2))]);

        assert!(spec.matches_component(&item(0), &bindings));
        assert!(spec.matches_component(&item(1), &bindings));
        assert!(!spec.matches_component(&item(2), &bindings));
    }

    #[test]
    fn key_sets_must_agree() {
        let spec = DependencySpec::pattern([("index", Selector::All)], "value");
        assert!(!spec.matches_component(&item(0), &Bindings::new()));
        assert!(!spec.matches_component(&ComponentId::from("index"), &Bindings::new()));
    }

    #[test]
    fn capture_binds_match_keys_only() {
        let spec = DependencySpec::pattern(
            [("type", Selector::All), ("index", Selector::Match)],
            "value",
        );
        let captured = spec.capture(&item(7)).unwrap();
        assert_eq!(captured, Bindings::from([("index".to_string(), KeyValue::from(7))]));

        let literal = item_spec(Selector::Match);
        let other = ComponentId::keyed([("type", KeyValue::from("row")), ("index", KeyValue::from(7))]);
        assert!(literal.capture(&other).is_none());
    }

    #[test]
    fn overlap_between_exact_and_pattern() {
        let exact = DependencySpec::exact(item(4), "value");
        assert!(exact.may_overlap(&item_spec(Selector::All)));
        assert!(!exact.may_overlap(&DependencySpec::exact(item(4), "style")));
        assert!(!DependencySpec::exact("item", "value").may_overlap(&item_spec(Selector::All)));
    }
}
