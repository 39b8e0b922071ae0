//! The runtime value model.
//!
//! Scalars are first-class variants so signature binding can classify them
//! without plugin involvement. Everything a plugin owns travels as a
//! type-erased `Arc<dyn Any + Send + Sync>` payload; concrete type
//! predicates downcast to claim it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased plugin payload.
pub type DynObject = Arc<dyn Any + Send + Sync>;

/// A value flowing through dispatch: either a primitive scalar or an opaque
/// plugin object. Cloning is cheap (scalars copy, objects bump a refcount);
/// the resolver never mutates values it is handed.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A node identifier. Distinct from `Int` so signatures can require one.
    NodeId(u64),
    Object(DynObject),
}

/// Primitive classification used for scalar parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum_macros::Display)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Str,
    NodeId,
}

impl ScalarType {
    /// Whether `value` can bind to a parameter of this scalar kind.
    /// `Int` widens to `Float`; nothing else coerces.
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Bool, Value::Bool(_))
                | (ScalarType::Int, Value::Int(_))
                | (ScalarType::Float, Value::Float(_))
                | (ScalarType::Float, Value::Int(_))
                | (ScalarType::Str, Value::Str(_))
                | (ScalarType::NodeId, Value::NodeId(_))
        )
    }
}

impl Value {
    /// Wrap a plugin-owned payload.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// The scalar classification, or `None` for plugin objects.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Value::Bool(_) => Some(ScalarType::Bool),
            Value::Int(_) => Some(ScalarType::Int),
            Value::Float(_) => Some(ScalarType::Float),
            Value::Str(_) => Some(ScalarType::Str),
            Value::NodeId(_) => Some(ScalarType::NodeId),
            Value::Object(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float accessor with int widening, matching scalar binding.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_node_id(&self) -> Option<u64> {
        match self {
            Value::NodeId(v) => Some(*v),
            _ => None,
        }
    }

    /// Stable within-process identity of an object payload. Two `Value`s
    /// cloned from the same `Arc` share it.
    pub(crate) fn object_identity(&self) -> Option<usize> {
        match self {
            Value::Object(obj) => Some(Arc::as_ptr(obj) as *const u8 as usize),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::NodeId(v) => write!(f, "NodeId({v})"),
            Value::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
