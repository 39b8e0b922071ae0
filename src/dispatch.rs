//! Multi-dispatch of abstract algorithm calls.
//!
//! `dispatch` binds arguments against the abstract signature, classifies
//! each one by its concrete type, asks the planner for the cheapest chain
//! into every candidate implementation's parameter types, and emits the
//! least-cost [`Plan`]. No translator or algorithm runs during dispatch;
//! `execute` is the only place plugin code is invoked.

use crate::lazy::Placeholder;
use crate::plan::{ArgPlan, Plan, ReturnType};
use crate::planner::{self, TranslationTarget};
use crate::properties::PropertyMap;
use crate::registry::{
    AbstractAlgorithmDef, ConcreteParamType, ParamType, PluginError, Registry,
};
use crate::types::{ConcreteTypeId, TypeError, TypeInfo};
use crate::value::{ScalarType, Value};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("{algorithm} takes {want} arguments, {got} given")]
    TooManyArguments {
        algorithm: String,
        got: usize,
        want: usize,
    },
    #[error("{algorithm} has no parameter named `{name}`")]
    UnknownKeyword { algorithm: String, name: String },
    #[error("{algorithm} got multiple values for parameter `{name}`")]
    DuplicateArgument { algorithm: String, name: String },
    #[error("{algorithm} missing required parameter `{name}`")]
    MissingArgument { algorithm: String, name: String },
    #[error("{algorithm} parameter `{param}` expects {expected}, got {got}")]
    KindMismatch {
        algorithm: String,
        param: String,
        expected: String,
        got: String,
    },
}

/// Why one candidate implementation was skipped. Collected so a failed
/// dispatch can explain itself.
#[derive(Debug, Clone)]
pub struct CandidateRejection {
    pub candidate: String,
    pub param: String,
    pub reason: String,
}

impl fmt::Display for CandidateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: parameter `{}`: {}", self.candidate, self.param, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("no concrete algorithm for {algorithm}:\n{}", render_rejections(.rejections))]
    NoConcreteAlgorithm {
        algorithm: String,
        rejections: Vec<CandidateRejection>,
    },
}

fn render_rejections(rejections: &[CandidateRejection]) -> String {
    if rejections.is_empty() {
        return "  (no implementations registered)".to_string();
    }
    rejections
        .iter()
        .map(|r| format!("  {r}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("plan expects {want} arguments, {got} given")]
    ArityMismatch { got: usize, want: usize },
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("translator {translator} failed: {source}")]
    Translation {
        translator: String,
        #[source]
        source: PluginError,
    },
    #[error("translator {translator} returned a {got}, declared {expected}")]
    TranslationTypeMismatch {
        translator: String,
        expected: String,
        got: String,
    },
    #[error("{algorithm} failed: {source}")]
    Algorithm {
        algorithm: String,
        #[source]
        source: PluginError,
    },
    #[error("{algorithm} returned a {got}, declared {expected}")]
    ReturnTypeMismatch {
        algorithm: String,
        expected: String,
        got: String,
    },
}

/// One argument of a call: an eager value, or a placeholder from a previous
/// lazy call.
#[derive(Debug, Clone)]
pub enum CallArg {
    Value(Value),
    Deferred(Placeholder),
}

impl From<Value> for CallArg {
    fn from(v: Value) -> Self {
        CallArg::Value(v)
    }
}

impl From<bool> for CallArg {
    fn from(v: bool) -> Self {
        CallArg::Value(Value::Bool(v))
    }
}

impl From<i64> for CallArg {
    fn from(v: i64) -> Self {
        CallArg::Value(Value::Int(v))
    }
}

impl From<f64> for CallArg {
    fn from(v: f64) -> Self {
        CallArg::Value(Value::Float(v))
    }
}

impl From<&str> for CallArg {
    fn from(v: &str) -> Self {
        CallArg::Value(Value::Str(v.to_string()))
    }
}

impl From<Placeholder> for CallArg {
    fn from(p: Placeholder) -> Self {
        CallArg::Deferred(p)
    }
}

impl From<&Placeholder> for CallArg {
    fn from(p: &Placeholder) -> Self {
        CallArg::Deferred(p.clone())
    }
}

/// Positional and keyword arguments of one call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<CallArg>,
    keyword: Vec<(String, CallArg)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<CallArg>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<CallArg>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }
}

/// Classification of one bound argument.
#[derive(Debug, Clone)]
pub(crate) enum ArgClass {
    Scalar(ScalarType),
    Typed {
        concrete: ConcreteTypeId,
        info: TypeInfo,
    },
}

/// Bind positional and keyword arguments to the signature, applying
/// defaults. The result is one `CallArg` per parameter, in signature order.
pub(crate) fn bind(
    def: &AbstractAlgorithmDef,
    args: &CallArgs,
) -> Result<Vec<CallArg>, SignatureError> {
    let want = def.params.len();
    if args.positional.len() > want {
        return Err(SignatureError::TooManyArguments {
            algorithm: def.name.clone(),
            got: args.positional.len(),
            want,
        });
    }
    let mut slots: Vec<Option<CallArg>> = vec![None; want];
    for (i, arg) in args.positional.iter().enumerate() {
        slots[i] = Some(arg.clone());
    }
    for (name, arg) in &args.keyword {
        let (i, _) = def
            .param(name)
            .ok_or_else(|| SignatureError::UnknownKeyword {
                algorithm: def.name.clone(),
                name: name.clone(),
            })?;
        if slots[i].is_some() {
            return Err(SignatureError::DuplicateArgument {
                algorithm: def.name.clone(),
                name: name.clone(),
            });
        }
        slots[i] = Some(arg.clone());
    }
    let mut bound = Vec::with_capacity(want);
    for (slot, param) in slots.into_iter().zip(&def.params) {
        let arg = match slot {
            Some(arg) => arg,
            None => CallArg::Value(param.default.clone().ok_or_else(|| {
                SignatureError::MissingArgument {
                    algorithm: def.name.clone(),
                    name: param.name.clone(),
                }
            })?),
        };
        check_kind(def, param.name.as_str(), &param.ty, &arg)?;
        bound.push(arg);
    }
    Ok(bound)
}

fn check_kind(
    def: &AbstractAlgorithmDef,
    param: &str,
    ty: &ParamType,
    arg: &CallArg,
) -> Result<(), SignatureError> {
    let mismatch = |got: String| SignatureError::KindMismatch {
        algorithm: def.name.clone(),
        param: param.to_string(),
        expected: ty.to_string(),
        got,
    };
    match (ty, arg) {
        (ParamType::Scalar(kind), CallArg::Value(v)) => {
            if !kind.admits(v) {
                return Err(mismatch(format!("{v:?}")));
            }
        }
        (ParamType::Scalar(kind), CallArg::Deferred(p)) => match p.scalar_type() {
            Some(got) if got == *kind || (*kind == ScalarType::Float && got == ScalarType::Int) => {}
            _ => return Err(mismatch("deferred non-scalar".to_string())),
        },
        (ParamType::Abstract(_), CallArg::Value(v)) => {
            if !v.is_object() {
                return Err(mismatch(format!("{v:?}")));
            }
        }
        (ParamType::Abstract(_), CallArg::Deferred(p)) => {
            if p.concrete_type().is_none() {
                return Err(mismatch("deferred scalar".to_string()));
            }
        }
    }
    Ok(())
}

/// Classify a bound argument without running plugin translators or
/// algorithms. Property extraction on eager values is the only plugin code
/// that runs here, same as type inference itself.
pub(crate) fn classify(registry: &Registry, arg: &CallArg) -> Result<ArgClass, TypeError> {
    match arg {
        CallArg::Value(v) => match v.scalar_type() {
            Some(kind) => Ok(ArgClass::Scalar(kind)),
            None => {
                let (concrete, info) = registry.typeinfo(v)?;
                Ok(ArgClass::Typed { concrete, info })
            }
        },
        CallArg::Deferred(p) => Ok(match p.type_class() {
            ArgClass::Scalar(kind) => ArgClass::Scalar(kind),
            typed => typed,
        }),
    }
}

/// Resolve an abstract call to the least-cost plan. Pure: inspects the
/// registry and the arguments, runs nothing.
pub fn dispatch(
    registry: &Registry,
    algorithm: &str,
    args: &CallArgs,
) -> Result<Plan, DispatchError> {
    let def = registry
        .abstract_algorithm(algorithm)
        .ok_or_else(|| DispatchError::UnknownAlgorithm(algorithm.to_string()))?;
    let bound = bind(def, args)?;
    dispatch_bound(registry, def, &bound)
}

pub(crate) fn dispatch_bound(
    registry: &Registry,
    def: &AbstractAlgorithmDef,
    bound: &[CallArg],
) -> Result<Plan, DispatchError> {
    let classes = bound
        .iter()
        .map(|arg| classify(registry, arg))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rejections = Vec::new();
    let mut best: Option<Plan> = None;

    'candidates: for &cid in registry.implementations(&def.name) {
        let cdef = registry.concrete_algorithm(cid);
        let mut arg_plans = Vec::with_capacity(bound.len());
        let mut total_cost = 0.0;

        for ((cparam, aparam), class) in cdef.params.iter().zip(&def.params).zip(&classes) {
            match (cparam, class) {
                (ConcreteParamType::Scalar(kind), ArgClass::Scalar(_)) => {
                    arg_plans.push((aparam.name.clone(), ArgPlan::Scalar(*kind)));
                }
                (ConcreteParamType::Concrete(cspec), ArgClass::Typed { concrete, info }) => {
                    let target_id = registry
                        .concrete_type_id(&cspec.concrete_name)
                        .map_err(DispatchError::Type)?;
                    // The chain must land on the parameter's type satisfying
                    // both the abstract signature's constraints and the
                    // implementation's refinements.
                    let mut constraints = match &aparam.ty {
                        ParamType::Abstract(spec) => spec.constraints.clone(),
                        ParamType::Scalar(_) => PropertyMap::new(),
                    };
                    constraints.extend(
                        cspec
                            .abstract_constraints
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone())),
                    );
                    let target = TranslationTarget {
                        concrete: target_id,
                        abstract_constraints: constraints,
                    };
                    match planner::plan_translation(
                        registry,
                        *concrete,
                        &info.abstract_props,
                        &target,
                    ) {
                        Ok(chain) => {
                            if chain.is_empty()
                                && !crate::properties::satisfies(
                                    &cspec.concrete_constraints,
                                    &info.concrete_props,
                                )
                            {
                                rejections.push(CandidateRejection {
                                    candidate: cdef.name.clone(),
                                    param: aparam.name.clone(),
                                    reason: "concrete properties do not satisfy the parameter"
                                        .to_string(),
                                });
                                continue 'candidates;
                            }
                            total_cost += chain.total_cost;
                            arg_plans.push((aparam.name.clone(), ArgPlan::Chain(chain)));
                        }
                        Err(err) => {
                            rejections.push(CandidateRejection {
                                candidate: cdef.name.clone(),
                                param: aparam.name.clone(),
                                reason: err.to_string(),
                            });
                            continue 'candidates;
                        }
                    }
                }
                (cparam, class) => {
                    rejections.push(CandidateRejection {
                        candidate: cdef.name.clone(),
                        param: aparam.name.clone(),
                        reason: format!("argument {class:?} cannot bind {cparam:?}"),
                    });
                    continue 'candidates;
                }
            }
        }

        let ret = match &cdef.ret {
            ConcreteParamType::Concrete(cspec) => ReturnType::Concrete {
                concrete: registry
                    .concrete_type_id(&cspec.concrete_name)
                    .map_err(DispatchError::Type)?,
                constraints: cspec.abstract_constraints.clone(),
            },
            ConcreteParamType::Scalar(kind) => ReturnType::Scalar(*kind),
        };
        let candidate = Plan {
            algorithm: def.name.clone(),
            concrete: cid,
            concrete_name: cdef.name.clone(),
            args: arg_plans,
            total_cost,
            ret,
        };

        let better = match &best {
            None => true,
            Some(current) => {
                match candidate.total_cost.total_cmp(&current.total_cost) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    std::cmp::Ordering::Equal => {
                        match candidate.total_hops().cmp(&current.total_hops()) {
                            std::cmp::Ordering::Less => true,
                            std::cmp::Ordering::Greater => false,
                            std::cmp::Ordering::Equal => {
                                candidate.concrete_name < current.concrete_name
                            }
                        }
                    }
                }
            }
        };
        if better {
            best = Some(candidate);
        }
    }

    match best {
        Some(plan) => {
            log::debug!(
                "dispatch {}: chose {} (cost {}, {} hops)",
                def.name,
                plan.concrete_name,
                plan.total_cost,
                plan.total_hops()
            );
            Ok(plan)
        }
        None => Err(DispatchError::NoConcreteAlgorithm {
            algorithm: def.name.clone(),
            rejections,
        }),
    }
}

/// Apply a translation chain to a value, hop by hop. Each hop receives the
/// abstract properties the chain expects of its result, and every produced
/// value is checked against the translator's declared destination type.
pub(crate) fn run_chain(
    registry: &Registry,
    chain: &crate::planner::TranslationChain,
    value: &Value,
) -> Result<Value, ExecuteError> {
    if chain.is_empty() {
        return Ok(value.clone());
    }
    let (_, info) = registry.typeinfo(value)?;
    let mut props = info.abstract_props;
    let mut current = value.clone();
    for step in &chain.steps {
        let translator = registry.translator(*step);
        props = translator.propagate(&props);
        current =
            (translator.func)(&current, &props).map_err(|source| ExecuteError::Translation {
                translator: translator.name.clone(),
                source,
            })?;
        let (_, declared_dst) = registry.translator_endpoints(*step);
        let got = registry.infer_concrete_type(&current)?;
        if got != declared_dst {
            return Err(ExecuteError::TranslationTypeMismatch {
                translator: translator.name.clone(),
                expected: registry.concrete_type(declared_dst).name.clone(),
                got: registry.concrete_type(got).name.clone(),
            });
        }
    }
    Ok(current)
}

/// Run a plan against eager argument values: apply each argument's chain in
/// order, invoke the implementation, validate the result type.
pub fn execute(
    registry: &Registry,
    plan: &Plan,
    args: &[Value],
    strict_return_type_check: bool,
) -> Result<Value, ExecuteError> {
    if args.len() != plan.args.len() {
        return Err(ExecuteError::ArityMismatch {
            got: args.len(),
            want: plan.args.len(),
        });
    }

    let mut translated = Vec::with_capacity(args.len());
    for (value, (_, arg_plan)) in args.iter().zip(&plan.args) {
        match arg_plan {
            ArgPlan::Scalar(_) => translated.push(value.clone()),
            ArgPlan::Chain(chain) => translated.push(run_chain(registry, chain, value)?),
        }
    }

    let cdef = registry.concrete_algorithm(plan.concrete);
    let result = (cdef.func)(&translated).map_err(|source| ExecuteError::Algorithm {
        algorithm: cdef.name.clone(),
        source,
    })?;

    match &plan.ret {
        ReturnType::Concrete { concrete, .. } => {
            let got = registry.infer_concrete_type(&result)?;
            if got != *concrete {
                let expected = registry.concrete_type(*concrete).name.clone();
                let got = registry.concrete_type(got).name.clone();
                if strict_return_type_check {
                    return Err(ExecuteError::ReturnTypeMismatch {
                        algorithm: cdef.name.clone(),
                        expected,
                        got,
                    });
                }
                log::warn!(
                    "{} returned a {got}, declared {expected}",
                    cdef.name
                );
            }
        }
        ReturnType::Scalar(kind) => {
            if !kind.admits(&result) {
                let got = format!("{result:?}");
                if strict_return_type_check {
                    return Err(ExecuteError::ReturnTypeMismatch {
                        algorithm: cdef.name.clone(),
                        expected: kind.to_string(),
                        got,
                    });
                }
                log::warn!("{} returned {got}, declared {kind}", cdef.name);
            }
        }
    }
    Ok(result)
}
