//! Shared fixtures: a scenario registry with three interchangeable graph
//! representations, and a numeric registry exercising property-refined
//! dispatch.
#![allow(dead_code)]

use metagraph::properties::{props, PropertyDomain, PropertyValue};
use metagraph::registry::{
    AbstractAlgorithmDef, AbstractParam, ConcreteAlgorithmDef, ConcreteParamType, Entry, ParamType,
    PluginError, StaticEntries, TranslatorDef,
};
use metagraph::types::{
    AbstractTypeDef, ConcreteTypeDef, ConcreteTypeOps, ConcreteTypeSpec, EqualityError, TypeError,
    TypeInfo, TypeSpec,
};
use metagraph::value::{ScalarType, Value};
use metagraph::{CallArgs, CallOutput, Resolver, ResolverConfig};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- scenario fixture: NX / Scipy / Grblas graph stand-ins ---

#[derive(Debug, Clone, PartialEq)]
pub struct NxGraph(pub Vec<(u64, u64)>);

#[derive(Debug, Clone, PartialEq)]
pub struct ScipyGraph(pub Vec<(u64, u64)>);

#[derive(Debug, Clone, PartialEq)]
pub struct GrblasGraph(pub Vec<(u64, u64)>);

#[derive(Debug, Clone, PartialEq)]
pub struct NumpyVector(pub Vec<f64>);

macro_rules! plain_type_ops {
    ($ops:ident, $payload:ident) => {
        pub struct $ops;

        impl ConcreteTypeOps for $ops {
            fn is_typeclass_of(&self, value: &Value) -> bool {
                value.downcast_ref::<$payload>().is_some()
            }

            fn typeinfo(&self, _value: &Value) -> Result<TypeInfo, TypeError> {
                Ok(TypeInfo::default())
            }

            fn assert_equal(
                &self,
                a: &Value,
                b: &Value,
                _rel_tol: f64,
                _abs_tol: f64,
            ) -> Result<(), EqualityError> {
                let a = a
                    .downcast_ref::<$payload>()
                    .ok_or_else(|| EqualityError::new("wrong representation"))?;
                let b = b
                    .downcast_ref::<$payload>()
                    .ok_or_else(|| EqualityError::new("wrong representation"))?;
                if a == b {
                    Ok(())
                } else {
                    Err(EqualityError::new(format!("{a:?} != {b:?}")))
                }
            }
        }
    };
}

plain_type_ops!(NxGraphType, NxGraph);
plain_type_ops!(ScipyGraphType, ScipyGraph);
plain_type_ops!(GrblasGraphType, GrblasGraph);
plain_type_ops!(NumpyVectorType, NumpyVector);

fn bfs_order(edges: &[(u64, u64)], source: u64) -> Vec<f64> {
    let mut visited = vec![source];
    let mut seen: HashSet<u64> = visited.iter().copied().collect();
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        let mut neighbors: Vec<u64> = edges
            .iter()
            .filter(|(u, _)| *u == node)
            .map(|(_, v)| *v)
            .collect();
        neighbors.sort_unstable();
        for next in neighbors {
            if seen.insert(next) {
                visited.push(next);
                queue.push_back(next);
            }
        }
    }
    visited.into_iter().map(|n| n as f64).collect()
}

fn uniform_ranks(edges: &[(u64, u64)]) -> Vec<f64> {
    let nodes: HashSet<u64> = edges.iter().flat_map(|&(u, v)| [u, v]).collect();
    let n = nodes.len().max(1);
    vec![1.0 / n as f64; n]
}

/// Entries for the scenario registry. `include_scipy_bfs` adds the second
/// bfs implementation; `pagerank_calls` counts pagerank invocations so
/// shared-upstream deduplication is observable.
pub fn scenario_entries(
    include_scipy_bfs: bool,
    pagerank_calls: Arc<AtomicUsize>,
) -> StaticEntries {
    let mut entries = StaticEntries::new();

    entries.push(Entry::AbstractType(AbstractTypeDef::new("Graph")));
    entries.push(Entry::AbstractType(
        AbstractTypeDef::new("Vector")
            .with_property(PropertyDomain::choice("dtype", ["int", "float"], "float")),
    ));

    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "NxGraph",
        "Graph",
        Arc::new(NxGraphType),
    )));
    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "ScipyGraph",
        "Graph",
        Arc::new(ScipyGraphType),
    )));
    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "GrblasGraph",
        "Graph",
        Arc::new(GrblasGraphType),
    )));
    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "NumpyVector",
        "Vector",
        Arc::new(NumpyVectorType),
    )));

    entries.push(Entry::Translator(TranslatorDef::new(
        "nx_to_scipy",
        "NxGraph",
        "ScipyGraph",
        |value, _requested| {
            let g = value
                .downcast_ref::<NxGraph>()
                .ok_or_else(|| PluginError::new("expected NxGraph"))?;
            Ok(Value::object(ScipyGraph(g.0.clone())))
        },
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "scipy_to_nx",
        "ScipyGraph",
        "NxGraph",
        |value, _requested| {
            let g = value
                .downcast_ref::<ScipyGraph>()
                .ok_or_else(|| PluginError::new("expected ScipyGraph"))?;
            Ok(Value::object(NxGraph(g.0.clone())))
        },
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "scipy_to_grblas",
        "ScipyGraph",
        "GrblasGraph",
        |value, _requested| {
            let g = value
                .downcast_ref::<ScipyGraph>()
                .ok_or_else(|| PluginError::new("expected ScipyGraph"))?;
            Ok(Value::object(GrblasGraph(g.0.clone())))
        },
    )));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new(
            "traversal.bfs_iter",
            ParamType::Abstract(TypeSpec::of("Vector")),
        )
        .with_param(AbstractParam::typed("graph", TypeSpec::of("Graph")))
        .with_param(AbstractParam::scalar("source", ScalarType::Int)),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "bfs_iter_nx",
            "traversal.bfs_iter",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("NumpyVector")),
            |args| {
                let g = args[0]
                    .downcast_ref::<NxGraph>()
                    .ok_or_else(|| PluginError::new("expected NxGraph"))?;
                let source = args[1]
                    .as_int()
                    .ok_or_else(|| PluginError::new("expected int source"))?;
                Ok(Value::object(NumpyVector(bfs_order(&g.0, source as u64))))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("NxGraph")))
        .with_param(ConcreteParamType::Scalar(ScalarType::Int)),
    ));
    if include_scipy_bfs {
        entries.push(Entry::ConcreteAlgorithm(
            ConcreteAlgorithmDef::new(
                "bfs_iter_scipy",
                "traversal.bfs_iter",
                ConcreteParamType::Concrete(ConcreteTypeSpec::of("NumpyVector")),
                |args| {
                    let g = args[0]
                        .downcast_ref::<ScipyGraph>()
                        .ok_or_else(|| PluginError::new("expected ScipyGraph"))?;
                    let source = args[1]
                        .as_int()
                        .ok_or_else(|| PluginError::new("expected int source"))?;
                    Ok(Value::object(NumpyVector(bfs_order(&g.0, source as u64))))
                },
            )
            .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of(
                "ScipyGraph",
            )))
            .with_param(ConcreteParamType::Scalar(ScalarType::Int)),
        ));
    }

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new(
            "centrality.pagerank",
            ParamType::Abstract(TypeSpec::of("Vector")),
        )
        .with_param(AbstractParam::typed("graph", TypeSpec::of("Graph"))),
    ));
    let calls = Arc::clone(&pagerank_calls);
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "pagerank_nx",
            "centrality.pagerank",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("NumpyVector")),
            move |args| {
                calls.fetch_add(1, Ordering::SeqCst);
                let g = args[0]
                    .downcast_ref::<NxGraph>()
                    .ok_or_else(|| PluginError::new("expected NxGraph"))?;
                Ok(Value::object(NumpyVector(uniform_ranks(&g.0))))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("NxGraph"))),
    ));
    let calls = pagerank_calls;
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "pagerank_grblas",
            "centrality.pagerank",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("NumpyVector")),
            move |args| {
                calls.fetch_add(1, Ordering::SeqCst);
                let g = args[0]
                    .downcast_ref::<GrblasGraph>()
                    .ok_or_else(|| PluginError::new("expected GrblasGraph"))?;
                Ok(Value::object(NumpyVector(uniform_ranks(&g.0))))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of(
            "GrblasGraph",
        ))),
    ));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new("util.vector_sum", ParamType::Scalar(ScalarType::Float))
            .with_param(AbstractParam::typed("vector", TypeSpec::of("Vector"))),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "vector_sum_numpy",
            "util.vector_sum",
            ConcreteParamType::Scalar(ScalarType::Float),
            |args| {
                let v = args[0]
                    .downcast_ref::<NumpyVector>()
                    .ok_or_else(|| PluginError::new("expected NumpyVector"))?;
                Ok(Value::Float(v.0.iter().sum()))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of(
            "NumpyVector",
        ))),
    ));

    entries
}

pub fn scenario_resolver(include_scipy_bfs: bool) -> Resolver {
    let entries = scenario_entries(include_scipy_bfs, Arc::new(AtomicUsize::new(0)));
    Resolver::from_provider(&entries, ResolverConfig::default()).unwrap()
}

pub fn scenario_resolver_lazy(include_scipy_bfs: bool) -> Resolver {
    scenario_resolver(include_scipy_bfs).lazy()
}

/// Run a call and materialize the result regardless of resolver mode.
pub fn run_call(resolver: &Resolver, algorithm: &str, args: CallArgs) -> Value {
    match resolver.call(algorithm, args).unwrap() {
        CallOutput::Value(v) => v,
        CallOutput::Deferred(p) => resolver.compute(&p).unwrap(),
    }
}

// --- numeric fixture: property-refined dispatch ---

#[derive(Debug, Clone, PartialEq)]
pub struct IntNum(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub struct FloatNum(pub f64);

#[derive(Debug, Clone, PartialEq)]
pub struct StrNum(pub String);

fn positivity_of(value: f64) -> &'static str {
    if value > 0.0 {
        ">0"
    } else if value == 0.0 {
        ">=0"
    } else {
        "any"
    }
}

pub struct IntNumType;

impl ConcreteTypeOps for IntNumType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<IntNum>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let v = value
            .downcast_ref::<IntNum>()
            .ok_or_else(|| TypeError::WrongRepresentation {
                expected: "IntNum".to_string(),
            })?;
        Ok(TypeInfo::new(
            props([
                ("positivity", PropertyValue::from(positivity_of(v.0 as f64))),
                ("divisible_by_two", PropertyValue::Bool(v.0 % 2 == 0)),
            ]),
            Default::default(),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        _rel_tol: f64,
        _abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let a = a
            .downcast_ref::<IntNum>()
            .ok_or_else(|| EqualityError::new("wrong representation"))?;
        let b = b
            .downcast_ref::<IntNum>()
            .ok_or_else(|| EqualityError::new("wrong representation"))?;
        if a == b {
            Ok(())
        } else {
            Err(EqualityError::new(format!("{} != {}", a.0, b.0)))
        }
    }
}

pub struct FloatNumType;

impl ConcreteTypeOps for FloatNumType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<FloatNum>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let v = value
            .downcast_ref::<FloatNum>()
            .ok_or_else(|| TypeError::WrongRepresentation {
                expected: "FloatNum".to_string(),
            })?;
        let divisible = v.0.fract() == 0.0 && (v.0 / 2.0).fract() == 0.0;
        Ok(TypeInfo::new(
            props([
                ("positivity", PropertyValue::from(positivity_of(v.0))),
                ("divisible_by_two", PropertyValue::Bool(divisible)),
            ]),
            Default::default(),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let a = a
            .downcast_ref::<FloatNum>()
            .ok_or_else(|| EqualityError::new("wrong representation"))?;
        let b = b
            .downcast_ref::<FloatNum>()
            .ok_or_else(|| EqualityError::new("wrong representation"))?;
        let close = (a.0 - b.0).abs() <= f64::max(rel_tol * f64::max(a.0.abs(), b.0.abs()), abs_tol);
        if close {
            Ok(())
        } else {
            Err(EqualityError::new(format!("{} != {}", a.0, b.0)))
        }
    }
}

pub struct StrNumType;

impl ConcreteTypeOps for StrNumType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<StrNum>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let v = value
            .downcast_ref::<StrNum>()
            .ok_or_else(|| TypeError::WrongRepresentation {
                expected: "StrNum".to_string(),
            })?;
        let parsed: i64 = v.0.parse().unwrap_or(0);
        Ok(TypeInfo::new(
            props([
                ("positivity", PropertyValue::from(positivity_of(parsed as f64))),
                ("divisible_by_two", PropertyValue::Bool(parsed % 2 == 0)),
            ]),
            Default::default(),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        _rel_tol: f64,
        _abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let a = a
            .downcast_ref::<StrNum>()
            .ok_or_else(|| EqualityError::new("wrong representation"))?;
        let b = b
            .downcast_ref::<StrNum>()
            .ok_or_else(|| EqualityError::new("wrong representation"))?;
        if a == b {
            Ok(())
        } else {
            Err(EqualityError::new(format!("{} != {}", a.0, b.0)))
        }
    }
}

pub fn numeric_entries() -> StaticEntries {
    let mut entries = StaticEntries::new();

    entries.push(Entry::AbstractType(
        AbstractTypeDef::new("Number")
            .with_property(PropertyDomain::choice(
                "positivity",
                ["any", ">=0", ">0"],
                "any",
            ))
            .with_property(PropertyDomain::boolean("divisible_by_two", false)),
    ));
    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "IntNum",
        "Number",
        Arc::new(IntNumType),
    )));
    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "FloatNum",
        "Number",
        Arc::new(FloatNumType),
    )));
    entries.push(Entry::ConcreteType(ConcreteTypeDef::new(
        "StrNum",
        "Number",
        Arc::new(StrNumType),
    )));

    entries.push(Entry::Translator(TranslatorDef::new(
        "int_to_str",
        "IntNum",
        "StrNum",
        |value, _requested| {
            let v = value
                .downcast_ref::<IntNum>()
                .ok_or_else(|| PluginError::new("expected IntNum"))?;
            Ok(Value::object(StrNum(v.0.to_string())))
        },
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "str_to_int",
        "StrNum",
        "IntNum",
        |value, _requested| {
            let v = value
                .downcast_ref::<StrNum>()
                .ok_or_else(|| PluginError::new("expected StrNum"))?;
            let parsed: i64 = v
                .0
                .parse()
                .map_err(|_| PluginError::new(format!("{} is not an integer", v.0)))?;
            Ok(Value::object(IntNum(parsed)))
        },
    )));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new("power", ParamType::Abstract(TypeSpec::of("Number")))
            .with_param(AbstractParam::typed("x", TypeSpec::of("Number")))
            .with_param(AbstractParam::typed("p", TypeSpec::of("Number"))),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "int_power",
            "power",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("IntNum")),
            |args| {
                let x = args[0]
                    .downcast_ref::<IntNum>()
                    .ok_or_else(|| PluginError::new("expected IntNum"))?;
                let p = args[1]
                    .downcast_ref::<IntNum>()
                    .ok_or_else(|| PluginError::new("expected IntNum"))?;
                let exponent = u32::try_from(p.0)
                    .map_err(|_| PluginError::new("negative exponent"))?;
                Ok(Value::object(IntNum(x.0.pow(exponent))))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("IntNum")))
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("IntNum"))),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "strnum_power",
            "power",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("StrNum")),
            |args| {
                let x: i64 = args[0]
                    .downcast_ref::<StrNum>()
                    .and_then(|v| v.0.parse().ok())
                    .ok_or_else(|| PluginError::new("expected integral StrNum"))?;
                let p: i64 = args[1]
                    .downcast_ref::<StrNum>()
                    .and_then(|v| v.0.parse().ok())
                    .ok_or_else(|| PluginError::new("expected integral StrNum"))?;
                let exponent =
                    u32::try_from(p).map_err(|_| PluginError::new("negative exponent"))?;
                Ok(Value::object(StrNum(x.pow(exponent).to_string())))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("StrNum")))
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("StrNum"))),
    ));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new("ln", ParamType::Abstract(TypeSpec::of("Number"))).with_param(
            AbstractParam::typed("x", TypeSpec::of("Number").with("positivity", ">0")),
        ),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "float_ln",
            "ln",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("FloatNum")),
            |args| {
                let x = args[0]
                    .downcast_ref::<FloatNum>()
                    .ok_or_else(|| PluginError::new("expected FloatNum"))?;
                Ok(Value::object(FloatNum(x.0.ln())))
            },
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("FloatNum"))),
    ));

    entries.push(Entry::AbstractAlgorithm(AbstractAlgorithmDef::new(
        "util.zero",
        ParamType::Scalar(ScalarType::Int),
    )));
    entries.push(Entry::ConcreteAlgorithm(ConcreteAlgorithmDef::new(
        "zero_int",
        "util.zero",
        ConcreteParamType::Scalar(ScalarType::Int),
        |_args| Ok(Value::Int(0)),
    )));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new("util.add", ParamType::Scalar(ScalarType::Int))
            .with_param(AbstractParam::scalar("x", ScalarType::Int))
            .with_param(AbstractParam::scalar("y", ScalarType::Int)),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "add_ints",
            "util.add",
            ConcreteParamType::Scalar(ScalarType::Int),
            |args| {
                let x = args[0].as_int().ok_or_else(|| PluginError::new("expected int"))?;
                let y = args[1].as_int().ok_or_else(|| PluginError::new("expected int"))?;
                Ok(Value::Int(x + y))
            },
        )
        .with_param(ConcreteParamType::Scalar(ScalarType::Int))
        .with_param(ConcreteParamType::Scalar(ScalarType::Int)),
    ));

    entries
}

pub fn numeric_resolver() -> Resolver {
    Resolver::from_provider(&numeric_entries(), ResolverConfig::default()).unwrap()
}
