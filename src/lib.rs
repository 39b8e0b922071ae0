//! Dispatch of abstract graph algorithms over heterogeneous backend
//! representations.
//!
//! Plugins register abstract types (`Graph`, `NodeMap`, ...), concrete
//! in-memory representations of those types, translators between
//! representations, and algorithm implementations. A [`Resolver`] bound to a
//! frozen [`Registry`] turns a call like `centrality.pagerank(g)` into a
//! [`Plan`]: the cheapest concrete implementation plus the translation chains
//! needed to feed it, found by shortest-path search over the translator
//! multigraph. Plans run eagerly, or are deferred into a task DAG and
//! materialized through [`Placeholder`] handles.

pub mod dispatch;
pub mod lazy;
pub mod plan;
pub mod planner;
pub mod plugins;
pub mod properties;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod value;

pub use dispatch::{CallArg, CallArgs, DispatchError, ExecuteError};
pub use lazy::{Placeholder, TaskGraph, TaskKey};
pub use plan::Plan;
pub use planner::{PlanError, TranslationChain};
pub use properties::{PropertyDomain, PropertyMap, PropertyValue};
pub use registry::{
    AbstractAlgorithmDef, AbstractParam, ConcreteAlgorithmDef, ConcreteParamType, Entry,
    EntryProvider, ParamType, PluginError, Registry, RegistryBuilder, RegistryError,
    StaticEntries, TranslatorDef, WrapperDef,
};
pub use resolver::{CallOutput, Resolver, ResolverConfig, ResolverError, TypeRef};
pub use types::{
    AbstractTypeDef, AbstractTypeId, ConcreteTypeDef, ConcreteTypeId, ConcreteTypeOps,
    ConcreteTypeSpec, EqualityError, TypeError, TypeInfo, TypeSpec,
};
pub use value::{ScalarType, Value};
