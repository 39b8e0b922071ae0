//! Property lattice shared by abstract and concrete types.
//!
//! A property is a named attribute with a finite declared domain
//! (`is_directed` over `{true, false}`, `edge_dtype` over
//! `{"none", "int", "float"}`). Values carry a [`PropertyMap`]; type specs
//! constrain a subset of the declared properties and leave the rest free.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single property value. Kept as a small closed tag rather than open-ended
/// reflection so maps stay hashable and comparable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

/// Ordered property name → value map. BTreeMap keeps iteration, equality and
/// hashing deterministic, which the lazy task keys rely on.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Build a [`PropertyMap`] from `(name, value)` pairs.
pub fn props<I, K, V>(pairs: I) -> PropertyMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<PropertyValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// `true` iff every property constrained by `constraints` is present in
/// `actual` with an equal value. Unconstrained properties are free.
pub fn satisfies(constraints: &PropertyMap, actual: &PropertyMap) -> bool {
    constraints
        .iter()
        .all(|(name, want)| actual.get(name) == Some(want))
}

/// `true` iff two constraint maps agree on every property they both pin.
pub fn compatible(a: &PropertyMap, b: &PropertyMap) -> bool {
    a.iter()
        .all(|(name, v)| b.get(name).map(|other| other == v).unwrap_or(true))
}

/// Declared domain of one abstract property: the allowed values and the
/// default assumed when a plugin does not compute the property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDomain {
    pub name: String,
    pub allowed: Vec<PropertyValue>,
    pub default: PropertyValue,
}

impl PropertyDomain {
    pub fn new(
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = PropertyValue>,
        default: impl Into<PropertyValue>,
    ) -> Self {
        Self {
            name: name.into(),
            allowed: allowed.into_iter().collect(),
            default: default.into(),
        }
    }

    /// Domain over `{true, false}`.
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(
            name,
            [PropertyValue::Bool(false), PropertyValue::Bool(true)],
            default,
        )
    }

    /// Domain over a fixed set of strings.
    pub fn choice<'a>(
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = &'a str>,
        default: &str,
    ) -> Self {
        Self::new(
            name,
            allowed.into_iter().map(PropertyValue::from),
            default,
        )
    }

    pub fn contains(&self, value: &PropertyValue) -> bool {
        self.allowed.contains(value)
    }
}
