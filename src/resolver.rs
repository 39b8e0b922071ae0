//! The user-facing façade binding a frozen registry to call syntax.
//!
//! Algorithms are addressed by dotted path (`resolver.call
//! ("centrality.pagerank", ...)`); types and wrappers by name. In eager
//! mode a call dispatches and executes; in lazy mode it returns a
//! [`Placeholder`] wired into the deferred task graph. The `plan_*` variants
//! stop after dispatch so a plan can be inspected without running anything.

use crate::dispatch::{self, CallArg, CallArgs, DispatchError, ExecuteError};
use crate::lazy::{self, Placeholder, TaskGraphError};
use crate::plan::Plan;
use crate::planner::{self, PlanError, TranslationChain, TranslationTarget};
use crate::registry::{
    ConcreteAlgorithmDef, EntryProvider, PluginError, Registry, RegistryBuilder, RegistryError,
    WrapperDef,
};
use crate::types::{
    AbstractTypeDef, ConcreteTypeDef, ConcreteTypeId, EqualityError, TypeError,
};
use crate::value::Value;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Recognized resolver options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// When set, calls return placeholders instead of values.
    pub lazy: bool,
    /// When set, a return-type mismatch aborts execution; otherwise it only
    /// warns.
    pub strict_return_type_check: bool,
    /// Handed to the plugin-discovery collaborator at provider
    /// initialization. The built-in static provider ignores it.
    pub plugin_search_paths: Vec<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lazy: false,
            strict_return_type_check: true,
            plugin_search_paths: Vec::new(),
        }
    }
}

/// A concrete type referenced by descriptor id or by its name string.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Name(String),
    Id(ConcreteTypeId),
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Name(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::Name(name)
    }
}

impl From<ConcreteTypeId> for TypeRef {
    fn from(id: ConcreteTypeId) -> Self {
        TypeRef::Id(id)
    }
}

/// What a call produced: a value (eager) or a placeholder (lazy).
#[derive(Debug, Clone)]
pub enum CallOutput {
    Value(Value),
    Deferred(Placeholder),
}

impl CallOutput {
    pub fn into_value(self) -> Result<Value, ResolverError> {
        match self {
            CallOutput::Value(v) => Ok(v),
            CallOutput::Deferred(_) => Err(ResolverError::ExpectedValue),
        }
    }

    pub fn into_placeholder(self) -> Result<Placeholder, ResolverError> {
        match self {
            CallOutput::Deferred(p) => Ok(p),
            CallOutput::Value(_) => Err(ResolverError::ExpectedPlaceholder),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Task(#[from] TaskGraphError),
    #[error(transparent)]
    Equality(#[from] EqualityError),
    #[error("wrapper construction failed: {0}")]
    Wrapper(#[from] PluginError),
    #[error("eager resolver received a placeholder argument")]
    DeferredArgumentInEagerMode,
    #[error("call produced a placeholder, not a value")]
    ExpectedValue,
    #[error("call produced a value, not a placeholder")]
    ExpectedPlaceholder,
    #[error("no wrapper named {wrapper} under abstract type {abstract_name}")]
    UnknownWrapper {
        abstract_name: String,
        wrapper: String,
    },
    #[error("cannot compare a {left} with a {right}")]
    EqualityTypeMismatch { left: String, right: String },
}

/// Constructs concrete values from raw library data, addressed through the
/// wrapper namespace.
pub struct WrapperHandle<'a> {
    def: &'a WrapperDef,
}

impl WrapperHandle<'_> {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn concrete_name(&self) -> &str {
        &self.def.concrete_name
    }

    pub fn construct(&self, args: &[Value]) -> Result<Value, ResolverError> {
        Ok((self.def.construct)(args)?)
    }
}

/// The resolver: a frozen registry plus call-time configuration.
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: Registry, config: ResolverConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// Build a resolver straight from a plugin entry provider.
    pub fn from_provider(
        provider: &dyn EntryProvider,
        config: ResolverConfig,
    ) -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::new();
        builder.collect(provider);
        Ok(Self::with_config(builder.finalize()?, config))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// A lazy view over the same registry.
    pub fn lazy(&self) -> Resolver {
        let mut config = self.config.clone();
        config.lazy = true;
        Resolver {
            registry: Arc::clone(&self.registry),
            config,
        }
    }

    /// Dispatch and run an abstract algorithm call. Eager mode returns the
    /// value; lazy mode returns a placeholder wired to its upstream tasks.
    pub fn call(&self, algorithm: &str, args: CallArgs) -> Result<CallOutput, ResolverError> {
        let def = self
            .registry
            .abstract_algorithm(algorithm)
            .ok_or_else(|| DispatchError::UnknownAlgorithm(algorithm.to_string()))?;
        let bound = dispatch::bind(def, &args).map_err(DispatchError::from)?;
        let plan = dispatch::dispatch_bound(&self.registry, def, &bound)?;

        if self.config.lazy {
            return Ok(CallOutput::Deferred(Placeholder::from_call(plan, &bound)));
        }

        let values: Vec<Value> = bound
            .into_iter()
            .map(|arg| match arg {
                CallArg::Value(v) => Ok(v),
                CallArg::Deferred(_) => Err(ResolverError::DeferredArgumentInEagerMode),
            })
            .collect::<Result<_, _>>()?;
        let value = dispatch::execute(
            &self.registry,
            &plan,
            &values,
            self.config.strict_return_type_check,
        )?;
        Ok(CallOutput::Value(value))
    }

    /// Dispatch only: the plan a call would run, without running it.
    pub fn plan_call(&self, algorithm: &str, args: CallArgs) -> Result<Plan, ResolverError> {
        Ok(dispatch::dispatch(&self.registry, algorithm, &args)?)
    }

    /// Plan and execute a translation to the target concrete type.
    pub fn translate(
        &self,
        value: &Value,
        target: impl Into<TypeRef>,
    ) -> Result<Value, ResolverError> {
        let chain = self.plan_translate(value, target)?;
        Ok(dispatch::run_chain(&self.registry, &chain, value)?)
    }

    /// Plan a translation without executing it.
    pub fn plan_translate(
        &self,
        value: &Value,
        target: impl Into<TypeRef>,
    ) -> Result<TranslationChain, ResolverError> {
        let target_id = self.resolve_type_ref(target.into())?;
        let (src, info) = self.registry.typeinfo(value)?;
        Ok(planner::plan_translation(
            &self.registry,
            src,
            &info.abstract_props,
            &TranslationTarget::to_type(target_id),
        )?)
    }

    /// Materialize a placeholder (depth-first).
    pub fn compute(&self, placeholder: &Placeholder) -> Result<Value, ResolverError> {
        Ok(placeholder.compute(self)?)
    }

    /// Materialize several placeholders through one merged task graph,
    /// evaluating shared upstream tasks once.
    pub fn compute_all(
        &self,
        placeholders: &[&Placeholder],
    ) -> Result<Vec<Value>, ResolverError> {
        Ok(lazy::execute_all(self, placeholders)?)
    }

    fn resolve_type_ref(&self, target: TypeRef) -> Result<ConcreteTypeId, TypeError> {
        match target {
            TypeRef::Name(name) => self.registry.concrete_type_id(&name),
            TypeRef::Id(id) => Ok(id),
        }
    }

    // --- navigation ---

    pub fn abstract_type(&self, name: &str) -> Result<&AbstractTypeDef, ResolverError> {
        let id = self.registry.abstract_type_id(name)?;
        Ok(self.registry.abstract_type(id))
    }

    pub fn concrete_type(
        &self,
        target: impl Into<TypeRef>,
    ) -> Result<&ConcreteTypeDef, ResolverError> {
        let id = self.resolve_type_ref(target.into())?;
        Ok(self.registry.concrete_type(id))
    }

    pub fn abstract_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.abstract_type_names().collect();
        names.sort_unstable();
        names
    }

    pub fn concrete_type_names(&self, abstract_name: &str) -> Vec<&str> {
        self.registry.concrete_type_names_of(abstract_name)
    }

    pub fn algorithm_names(&self) -> Vec<&str> {
        self.registry.algorithm_names()
    }

    pub fn implementations(&self, algorithm: &str) -> Vec<&ConcreteAlgorithmDef> {
        self.registry
            .implementations(algorithm)
            .iter()
            .map(|&id| self.registry.concrete_algorithm(id))
            .collect()
    }

    /// Look up a wrapper under its abstract type's namespace.
    pub fn wrapper(
        &self,
        abstract_name: &str,
        wrapper_name: &str,
    ) -> Result<WrapperHandle<'_>, ResolverError> {
        let abstract_id = self.registry.abstract_type_id(abstract_name)?;
        self.registry
            .wrappers()
            .iter()
            .find(|w| {
                w.name == wrapper_name
                    && self
                        .registry
                        .concrete_type_id(&w.concrete_name)
                        .map(|c| self.registry.abstract_of(c) == abstract_id)
                        .unwrap_or(false)
            })
            .map(|def| WrapperHandle { def })
            .ok_or_else(|| ResolverError::UnknownWrapper {
                abstract_name: abstract_name.to_string(),
                wrapper: wrapper_name.to_string(),
            })
    }

    /// Semantic equality under the values' concrete type, with the default
    /// tolerances.
    pub fn assert_equal(&self, a: &Value, b: &Value) -> Result<(), ResolverError> {
        self.assert_equal_with(a, b, 1e-9, 0.0)
    }

    pub fn assert_equal_with(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), ResolverError> {
        let ta = self.registry.infer_concrete_type(a)?;
        let tb = self.registry.infer_concrete_type(b)?;
        if ta != tb {
            return Err(ResolverError::EqualityTypeMismatch {
                left: self.registry.concrete_type(ta).name.clone(),
                right: self.registry.concrete_type(tb).name.clone(),
            });
        }
        Ok(self
            .registry
            .concrete_type(ta)
            .ops
            .assert_equal(a, b, rel_tol, abs_tol)?)
    }
}
