//! Abstract and concrete type descriptors.
//!
//! An [`AbstractTypeDef`] names a category of value and declares its
//! property domains. A [`ConcreteTypeDef`] binds one in-memory
//! representation to an abstract type and carries the plugin-supplied
//! behavior ([`ConcreteTypeOps`]): the typeclass predicate, property
//! extraction, and semantic equality. Descriptors are plain data; after
//! registry finalization they are referenced by dense ids.

use crate::properties::{self, PropertyDomain, PropertyMap, PropertyValue};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbstractTypeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConcreteTypeId(pub(crate) u32);

impl fmt::Display for AbstractTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl fmt::Display for ConcreteTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("no registered concrete type claims the value")]
    NoMatchingType,
    #[error("value is claimed by both {first} and {second}")]
    AmbiguousType { first: String, second: String },
    #[error("scalar values have no concrete type")]
    ScalarValue,
    #[error("unknown type name: {0}")]
    UnknownType(String),
    #[error("value is not a {expected}")]
    WrongRepresentation { expected: String },
}

/// Raised by [`ConcreteTypeOps::assert_equal`] when two values differ under
/// the type's semantic-equality rule.
#[derive(Debug, thiserror::Error)]
#[error("values differ: {reason}")]
pub struct EqualityError {
    pub reason: String,
}

impl EqualityError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Property vectors extracted from one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TypeInfo {
    pub abstract_props: PropertyMap,
    pub concrete_props: PropertyMap,
}

impl TypeInfo {
    pub fn new(abstract_props: PropertyMap, concrete_props: PropertyMap) -> Self {
        Self {
            abstract_props,
            concrete_props,
        }
    }
}

/// Behavior a plugin supplies for each concrete type.
///
/// Implementations must be pure: the resolver calls them during dispatch and
/// may call them from worker threads.
pub trait ConcreteTypeOps: Send + Sync {
    /// Whether a runtime value is an instance of this concrete type.
    fn is_typeclass_of(&self, value: &Value) -> bool;

    /// Extract the abstract and concrete property vectors of a value that
    /// this type claims.
    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError>;

    /// Semantic equality between two values of this type. Exact or
    /// tolerance-based is the type's own choice.
    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError>;
}

/// A named category of value with declared property domains.
#[derive(Clone)]
pub struct AbstractTypeDef {
    pub name: String,
    pub properties: Vec<PropertyDomain>,
}

impl AbstractTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, domain: PropertyDomain) -> Self {
        self.properties.push(domain);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDomain> {
        self.properties.iter().find(|d| d.name == name)
    }

    /// The property vector assumed when a plugin computes nothing.
    pub fn default_props(&self) -> PropertyMap {
        self.properties
            .iter()
            .map(|d| (d.name.clone(), d.default.clone()))
            .collect()
    }
}

impl fmt::Debug for AbstractTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractTypeDef")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// One in-memory representation of an abstract type.
#[derive(Clone)]
pub struct ConcreteTypeDef {
    pub name: String,
    pub abstract_name: String,
    /// Abstract properties this representation pins for every value it
    /// claims (e.g. a CSR graph is always weighted). Checked against the
    /// abstract type's declared domains at finalization.
    pub pinned_abstract_props: PropertyMap,
    /// Names of the implementation-specific properties `typeinfo` computes.
    pub concrete_property_names: Vec<String>,
    pub ops: Arc<dyn ConcreteTypeOps>,
}

impl ConcreteTypeDef {
    pub fn new(
        name: impl Into<String>,
        abstract_name: impl Into<String>,
        ops: Arc<dyn ConcreteTypeOps>,
    ) -> Self {
        Self {
            name: name.into(),
            abstract_name: abstract_name.into(),
            pinned_abstract_props: PropertyMap::new(),
            concrete_property_names: Vec::new(),
            ops,
        }
    }

    pub fn with_pinned_prop(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.pinned_abstract_props.insert(name.into(), value.into());
        self
    }

    pub fn with_concrete_property(mut self, name: impl Into<String>) -> Self {
        self.concrete_property_names.push(name.into());
        self
    }
}

impl fmt::Debug for ConcreteTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcreteTypeDef")
            .field("name", &self.name)
            .field("abstract_name", &self.abstract_name)
            .field("pinned_abstract_props", &self.pinned_abstract_props)
            .finish()
    }
}

/// An abstract type reference with optional property constraints. Used as
/// parameter and return annotations in abstract algorithm signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub abstract_name: String,
    pub constraints: PropertyMap,
}

impl TypeSpec {
    pub fn of(abstract_name: impl Into<String>) -> Self {
        Self {
            abstract_name: abstract_name.into(),
            constraints: PropertyMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.constraints.insert(name.into(), value.into());
        self
    }

    /// Whether a value with these abstract properties satisfies the spec.
    pub fn satisfied_by(&self, abstract_props: &PropertyMap) -> bool {
        properties::satisfies(&self.constraints, abstract_props)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abstract_name)?;
        if !self.constraints.is_empty() {
            let parts: Vec<String> = self
                .constraints
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// A concrete type reference with property constraints. Used in concrete
/// algorithm parameter lists and as the target of a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcreteTypeSpec {
    pub concrete_name: String,
    pub abstract_constraints: PropertyMap,
    pub concrete_constraints: PropertyMap,
}

impl ConcreteTypeSpec {
    pub fn of(concrete_name: impl Into<String>) -> Self {
        Self {
            concrete_name: concrete_name.into(),
            abstract_constraints: PropertyMap::new(),
            concrete_constraints: PropertyMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.abstract_constraints.insert(name.into(), value.into());
        self
    }

    pub fn with_concrete(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.concrete_constraints.insert(name.into(), value.into());
        self
    }

    pub fn satisfied_by(&self, info: &TypeInfo) -> bool {
        properties::satisfies(&self.abstract_constraints, &info.abstract_props)
            && properties::satisfies(&self.concrete_constraints, &info.concrete_props)
    }
}

impl fmt::Display for ConcreteTypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.concrete_name)?;
        if !self.abstract_constraints.is_empty() || !self.concrete_constraints.is_empty() {
            let parts: Vec<String> = self
                .abstract_constraints
                .iter()
                .chain(self.concrete_constraints.iter())
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "({})", parts.join(", "))?;
        }
        Ok(())
    }
}
