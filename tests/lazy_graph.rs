//! Lazy task graph behavior: key determinism, deduplication of shared
//! upstream work, and mixing eager values into deferred calls.

mod common;

use common::{numeric_entries, scenario_entries, NumpyVector, NxGraph};
use metagraph::{CallArgs, Resolver, ResolverConfig, ResolverError, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn lazy_scenario_resolver_with_counter() -> (Resolver, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let entries = scenario_entries(false, Arc::clone(&counter));
    let resolver = Resolver::from_provider(
        &entries,
        ResolverConfig {
            lazy: true,
            ..Default::default()
        },
    )
    .unwrap();
    (resolver, counter)
}

fn sample_graph() -> Value {
    Value::object(NxGraph(vec![(0, 1), (1, 2)]))
}

#[test]
fn equal_calls_produce_equal_keys() {
    let (resolver, _) = lazy_scenario_resolver_with_counter();
    let g = sample_graph();

    let a = resolver
        .call("centrality.pagerank", CallArgs::new().arg(g.clone()))
        .unwrap()
        .into_placeholder()
        .unwrap();
    let b = resolver
        .call("centrality.pagerank", CallArgs::new().arg(g.clone()))
        .unwrap()
        .into_placeholder()
        .unwrap();
    assert_eq!(a.key(), b.key());

    // A different argument changes the key.
    let other = sample_graph();
    let c = resolver
        .call("centrality.pagerank", CallArgs::new().arg(other))
        .unwrap()
        .into_placeholder()
        .unwrap();
    assert_ne!(a.key(), c.key());

    // A different algorithm over the same argument changes the key.
    let d = resolver
        .call(
            "traversal.bfs_iter",
            CallArgs::new().arg(g.clone()).arg(0i64),
        )
        .unwrap()
        .into_placeholder()
        .unwrap();
    assert_ne!(a.key(), d.key());
}

#[test]
fn placeholder_carries_type_and_upstream() {
    let (resolver, _) = lazy_scenario_resolver_with_counter();
    let p = resolver
        .call("centrality.pagerank", CallArgs::new().arg(sample_graph()))
        .unwrap()
        .into_placeholder()
        .unwrap();
    let concrete = p.concrete_type().unwrap();
    assert_eq!(
        resolver.registry().concrete_type(concrete).name,
        "NumpyVector"
    );
    // One constant upstream task (the graph), one call task.
    assert_eq!(p.upstream_keys().len(), 1);
    assert_eq!(p.graph().len(), 2);
}

#[test]
fn placeholders_flow_into_later_calls() {
    let (resolver, counter) = lazy_scenario_resolver_with_counter();
    let g = sample_graph();

    let ranks = resolver
        .call("centrality.pagerank", CallArgs::new().arg(g))
        .unwrap()
        .into_placeholder()
        .unwrap();
    let total = resolver
        .call("util.vector_sum", CallArgs::new().arg(ranks.clone()))
        .unwrap()
        .into_placeholder()
        .unwrap();

    assert_eq!(total.scalar_type(), Some(metagraph::ScalarType::Float));
    assert!(total.upstream_keys().contains(&ranks.key()));

    let out = resolver.compute(&total).unwrap();
    assert!((out.as_float().unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn shared_upstream_evaluates_once_per_materialization() {
    let (resolver, counter) = lazy_scenario_resolver_with_counter();
    let g = sample_graph();

    let ranks = resolver
        .call("centrality.pagerank", CallArgs::new().arg(g))
        .unwrap()
        .into_placeholder()
        .unwrap();
    let s1 = resolver
        .call("util.vector_sum", CallArgs::new().arg(ranks.clone()))
        .unwrap()
        .into_placeholder()
        .unwrap();
    let s2 = resolver
        .call("util.vector_sum", CallArgs::new().arg(ranks.clone()))
        .unwrap()
        .into_placeholder()
        .unwrap();

    // Equal (plan, args) collapse onto one task key.
    assert_eq!(s1.key(), s2.key());

    // One scheduler pass over both placeholders evaluates pagerank once.
    let out = resolver.compute_all(&[&s1, &s2]).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!((out[0].as_float().unwrap() - 1.0).abs() < 1e-9);
    assert!((out[1].as_float().unwrap() - 1.0).abs() < 1e-9);

    // Independent materializations evaluate independently.
    resolver.compute(&s1).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn eager_values_become_constant_tasks() {
    let (resolver, _) = lazy_scenario_resolver_with_counter();
    let v = Value::object(NumpyVector(vec![1.0, 2.0, 3.5]));
    let p = resolver
        .call("util.vector_sum", CallArgs::new().arg(v))
        .unwrap()
        .into_placeholder()
        .unwrap();
    assert_eq!(p.graph().len(), 2);
    let out = resolver.compute(&p).unwrap();
    assert!((out.as_float().unwrap() - 6.5).abs() < 1e-9);
}

#[test]
fn scalar_placeholders_chain() {
    let resolver = Resolver::from_provider(
        &numeric_entries(),
        ResolverConfig {
            lazy: true,
            ..Default::default()
        },
    )
    .unwrap();

    let a = resolver
        .call("util.add", CallArgs::new().arg(1i64).arg(2i64))
        .unwrap()
        .into_placeholder()
        .unwrap();
    let b = resolver
        .call("util.add", CallArgs::new().arg(a.clone()).arg(4i64))
        .unwrap()
        .into_placeholder()
        .unwrap();
    assert_eq!(resolver.compute(&b).unwrap().as_int(), Some(7));
}

#[test]
fn eager_resolver_rejects_placeholder_arguments() {
    let (lazy, _) = lazy_scenario_resolver_with_counter();
    let p = lazy
        .call("centrality.pagerank", CallArgs::new().arg(sample_graph()))
        .unwrap()
        .into_placeholder()
        .unwrap();

    let eager = Resolver::from_provider(
        &scenario_entries(false, Arc::new(AtomicUsize::new(0))),
        ResolverConfig::default(),
    )
    .unwrap();
    let err = eager
        .call("util.vector_sum", CallArgs::new().arg(p))
        .unwrap_err();
    assert!(matches!(err, ResolverError::DeferredArgumentInEagerMode));
}
