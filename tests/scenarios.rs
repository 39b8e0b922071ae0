//! End-to-end dispatch scenarios over the NX/Scipy/Grblas fixture, run
//! against both the eager and the lazy resolver.

mod common;

use common::{
    run_call, scenario_resolver, scenario_resolver_lazy, GrblasGraph, NumpyVector, NxGraph,
    ScipyGraph,
};
use metagraph::{CallArgs, Resolver, Value};
use paste::paste;

fn sample_graph() -> Value {
    Value::object(NxGraph(vec![(0, 1), (1, 2), (0, 2)]))
}

#[test]
fn s1_direct_translation() {
    let resolver = scenario_resolver(false);
    let v = sample_graph();
    let chain = resolver.plan_translate(&v, "ScipyGraph").unwrap();
    assert_eq!(chain.hops(), 1);
    assert_eq!(chain.total_cost, 1.0);
    let rendered = chain.describe(resolver.registry());
    assert_eq!(rendered, "NxGraph → (via nx_to_scipy) → ScipyGraph");

    let translated = resolver.translate(&v, "ScipyGraph").unwrap();
    assert_eq!(
        translated.downcast_ref::<ScipyGraph>().unwrap().0,
        vec![(0, 1), (1, 2), (0, 2)]
    );
}

#[test]
fn s2_multi_hop_and_identity() {
    let resolver = scenario_resolver(false);
    let v = sample_graph();

    let chain = resolver.plan_translate(&v, "GrblasGraph").unwrap();
    assert_eq!(chain.hops(), 2);
    assert_eq!(chain.total_cost, 2.0);
    assert_eq!(
        chain.describe(resolver.registry()),
        "NxGraph → (via nx_to_scipy) → ScipyGraph → (via scipy_to_grblas) → GrblasGraph"
    );
    let translated = resolver.translate(&v, "GrblasGraph").unwrap();
    assert!(translated.downcast_ref::<GrblasGraph>().is_some());

    let identity = resolver.plan_translate(&v, "NxGraph").unwrap();
    assert!(identity.is_empty());
    assert_eq!(identity.total_cost, 0.0);
}

fn s3_dispatch_no_translation(resolver: &Resolver) {
    let plan = resolver
        .plan_call(
            "traversal.bfs_iter",
            CallArgs::new().arg(sample_graph()).arg(0i64),
        )
        .unwrap();
    assert_eq!(plan.concrete_name, "bfs_iter_nx");
    assert_eq!(plan.total_cost, 0.0);
    assert_eq!(plan.total_hops(), 0);

    let out = run_call(
        resolver,
        "traversal.bfs_iter",
        CallArgs::new().arg(sample_graph()).arg(0i64),
    );
    assert_eq!(
        out.downcast_ref::<NumpyVector>().unwrap().0,
        vec![0.0, 1.0, 2.0]
    );
}

fn s4_zero_cost_candidate_wins(resolver: &Resolver) {
    // Both bfs implementations are viable for an NxGraph; the native one
    // costs 0 and must win.
    let plan = resolver
        .plan_call(
            "traversal.bfs_iter",
            CallArgs::new().arg(sample_graph()).arg(0i64),
        )
        .unwrap();
    assert_eq!(plan.concrete_name, "bfs_iter_nx");
    assert_eq!(plan.total_cost, 0.0);
}

fn s5_forced_translation_lexicographic_tie(resolver: &Resolver) {
    // pagerank exists only for NxGraph and GrblasGraph. A ScipyGraph input
    // reaches either at cost 1; the tie breaks to the lexicographically
    // smaller implementation name.
    let v = Value::object(ScipyGraph(vec![(0, 1), (1, 2)]));
    let plan = resolver
        .plan_call("centrality.pagerank", CallArgs::new().arg(v.clone()))
        .unwrap();
    assert_eq!(plan.concrete_name, "pagerank_grblas");
    assert_eq!(plan.total_cost, 1.0);
    assert_eq!(plan.total_hops(), 1);

    let out = run_call(resolver, "centrality.pagerank", CallArgs::new().arg(v));
    let ranks = out.downcast_ref::<NumpyVector>().unwrap();
    assert_eq!(ranks.0.len(), 3);
}

#[test]
fn s6_lazy_composition_shares_upstream() {
    let resolver = scenario_resolver_lazy(false);
    let g = sample_graph();

    let a = resolver
        .call(
            "traversal.bfs_iter",
            CallArgs::new().arg(g.clone()).arg(0i64),
        )
        .unwrap()
        .into_placeholder()
        .unwrap();
    let b = resolver
        .call("centrality.pagerank", CallArgs::new().arg(g.clone()))
        .unwrap()
        .into_placeholder()
        .unwrap();

    // Both placeholders hang off the same constant task for `g`.
    let a_upstream = a.upstream_keys();
    let b_upstream = b.upstream_keys();
    assert!(a_upstream.iter().any(|k| b_upstream.contains(k)));

    let va = resolver.compute(&a).unwrap();
    let vb = resolver.compute(&b).unwrap();
    assert_eq!(
        va.downcast_ref::<NumpyVector>().unwrap().0,
        vec![0.0, 1.0, 2.0]
    );
    assert_eq!(vb.downcast_ref::<NumpyVector>().unwrap().0.len(), 3);

    let both = resolver.compute_all(&[&a, &b]).unwrap();
    assert_eq!(both.len(), 2);
    assert_eq!(
        both[0].downcast_ref::<NumpyVector>().unwrap().0,
        va.downcast_ref::<NumpyVector>().unwrap().0
    );
}

macro_rules! do_mode_test {
    ($runner:expr, $mode:ident, $scenario:ident) => {
        paste! {
            #[test]
            fn [<$scenario _ $mode>]() {
                $scenario(&$runner);
            }
        }
    };
}

macro_rules! do_mode_tests {
    ($runner:expr, $mode:ident) => {
        do_mode_test!($runner, $mode, s3_dispatch_no_translation);
        do_mode_test!($runner, $mode, s5_forced_translation_lexicographic_tie);
    };
}

do_mode_tests!(scenario_resolver(false), eager);
do_mode_tests!(scenario_resolver_lazy(false), lazy);

do_mode_test!(scenario_resolver(true), eager, s4_zero_cost_candidate_wins);
do_mode_test!(scenario_resolver_lazy(true), lazy, s4_zero_cost_candidate_wins);
