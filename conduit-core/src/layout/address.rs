//! Component Addresses
//!
//! An address names one property of one component in the live tree. The
//! component half is either a plain string id or a keyed id: a small map of
//! key/value pairs that wildcard patterns can select over.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A value inside a keyed component id.
///
/// Any JSON scalar except `null` is a valid key value. Integers that fit in
/// an `i64` are kept exact; every other number is a [`FloatKey`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Boolean flag, e.g. `{"item": 3, "preceding": true}`.
    Bool(bool),
    /// Integer value, e.g. a list index.
    Int(i64),
    /// Non-integer number.
    Float(FloatKey),
    /// String value, e.g. a component type tag.
    Str(String),
}

impl KeyValue {
    /// Whether `self` sorts strictly before `other`.
    ///
    /// Values of different kinds are unordered and never precede each other.
    /// Booleans are never ordered.
    pub fn precedes(&self, other: &KeyValue) -> bool {
        match (self, other) {
            (KeyValue::Int(a), KeyValue::Int(b)) => a < b,
            (KeyValue::Float(a), KeyValue::Float(b)) => a.0 < b.0,
            (KeyValue::Str(a), KeyValue::Str(b)) => a < b,
            _ => false,
        }
    }
}

/// An `f64` usable as a map key: equality and ordering follow
/// [`f64::total_cmp`], hashing follows the bit pattern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloatKey(pub f64);

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for FloatKey {}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<bool> for KeyValue {
    fn from(value: bool) -> Self {
        KeyValue::Bool(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<f64> for KeyValue {
    fn from(value: f64) -> Self {
        KeyValue::Float(FloatKey(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Str(value)
    }
}

/// Values bound to wildcard keys for one callback instance.
///
/// Keys are the pattern keys carrying `MATCH` selectors; `ALLSMALLER`
/// selectors read the binding of the same key.
pub type Bindings = BTreeMap<String, KeyValue>;

/// Identifier of a component in the layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentId {
    /// A plain string id.
    Named(String),
    /// A keyed id, addressable by wildcard patterns.
    Keyed(BTreeMap<String, KeyValue>),
}

impl ComponentId {
    /// Build a keyed id from key/value pairs.
    pub fn keyed<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<KeyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        ComponentId::Keyed(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The keys of a keyed id, or `None` for a plain id.
    pub fn keys(&self) -> Option<&BTreeMap<String, KeyValue>> {
        match self {
            ComponentId::Named(_) => None,
            ComponentId::Keyed(keys) => Some(keys),
        }
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        ComponentId::Named(id.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        ComponentId::Named(id)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Named(id) => f.write_str(id),
            // BTreeMap keeps the keys sorted, so the rendering is canonical.
            ComponentId::Keyed(keys) => {
                let json = serde_json::to_string(keys).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// One property of one component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    /// The component.
    pub component: ComponentId,
    /// The property name on that component.
    pub property: String,
}

impl Address {
    /// Create an address.
    pub fn new(component: impl Into<ComponentId>, property: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.property)
    }
}
