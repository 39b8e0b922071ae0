//! Least-cost translation planning.
//!
//! The translators of one abstract type form a multigraph over its concrete
//! types. Planning is Dijkstra over `(concrete type, property vector)`
//! states: each hop re-derives the property vector through the translator's
//! transform, so a chain is accepted only when its *final* state satisfies
//! the requested constraints. Ties break on cost, then hop count, then the
//! lexicographic chain of translator names, keeping plans deterministic.

use crate::properties::{self, PropertyMap};
use crate::registry::{Registry, TranslatorId};
use crate::types::ConcreteTypeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::hash::{Hash, Hasher};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no translation path from {src} to {dst}")]
    NoTranslationPath { src: String, dst: String },
    #[error("{dst} is reachable from {src} but no chain satisfies {constraints}")]
    PropertyMismatch {
        src: String,
        dst: String,
        constraints: String,
    },
}

/// The least-cost sequence of translators from a source concrete type to a
/// target. An empty `steps` means the source already satisfies the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationChain {
    pub src: ConcreteTypeId,
    pub dst: ConcreteTypeId,
    pub steps: Vec<TranslatorId>,
    pub total_cost: f64,
    /// Abstract properties after the final hop.
    pub final_props: PropertyMap,
}

impl Eq for TranslationChain {}

impl Hash for TranslationChain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.src.hash(state);
        self.dst.hash(state);
        self.steps.hash(state);
        self.total_cost.to_bits().hash(state);
        self.final_props.hash(state);
    }
}

impl TranslationChain {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn hops(&self) -> usize {
        self.steps.len()
    }

    /// Render as `Src → (via t1) → Mid → (via t2) → Dst`.
    pub fn describe(&self, registry: &Registry) -> String {
        let mut out = registry.concrete_type(self.src).name.clone();
        for step in &self.steps {
            let translator = registry.translator(*step);
            let (_, dst) = registry.translator_endpoints(*step);
            out.push_str(&format!(
                " → (via {}) → {}",
                translator.name,
                registry.concrete_type(dst).name
            ));
        }
        out
    }
}

/// Translation target: a specific concrete type plus abstract property
/// constraints the final value must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationTarget {
    pub concrete: ConcreteTypeId,
    pub abstract_constraints: PropertyMap,
}

impl TranslationTarget {
    pub fn to_type(concrete: ConcreteTypeId) -> Self {
        Self {
            concrete,
            abstract_constraints: PropertyMap::new(),
        }
    }
}

struct SearchState {
    cost: f64,
    node: ConcreteTypeId,
    props: PropertyMap,
    steps: Vec<TranslatorId>,
    /// Translator names along the chain, kept for the lexicographic
    /// tie-break.
    names: Vec<String>,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchState {}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchState {
    // BinaryHeap is a max-heap; invert so the cheapest chain pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.steps.len().cmp(&self.steps.len()))
            .then_with(|| other.names.cmp(&self.names))
    }
}

/// Find the least-cost chain from `src` (a value with abstract properties
/// `src_props`) to `target`.
pub fn plan_translation(
    registry: &Registry,
    src: ConcreteTypeId,
    src_props: &PropertyMap,
    target: &TranslationTarget,
) -> Result<TranslationChain, PlanError> {
    let satisfied = |node: ConcreteTypeId, props: &PropertyMap| {
        node == target.concrete && properties::satisfies(&target.abstract_constraints, props)
    };

    let mut heap = BinaryHeap::new();
    let mut settled: HashSet<(ConcreteTypeId, PropertyMap)> = HashSet::new();
    let mut reached_target_type = false;

    heap.push(SearchState {
        cost: 0.0,
        node: src,
        props: src_props.clone(),
        steps: Vec::new(),
        names: Vec::new(),
    });

    while let Some(state) = heap.pop() {
        if !settled.insert((state.node, state.props.clone())) {
            continue;
        }
        if state.node == target.concrete {
            reached_target_type = true;
        }
        if satisfied(state.node, &state.props) {
            log::trace!(
                "translation {} -> {}: {} hops, cost {}",
                registry.concrete_type(src).name,
                registry.concrete_type(target.concrete).name,
                state.steps.len(),
                state.cost,
            );
            return Ok(TranslationChain {
                src,
                dst: state.node,
                steps: state.steps,
                total_cost: state.cost,
                final_props: state.props,
            });
        }

        for &edge in registry.translators_from(state.node) {
            let translator = registry.translator(edge);
            let (_, dst) = registry.translator_endpoints(edge);
            let next_props = translator.propagate(&state.props);
            if settled.contains(&(dst, next_props.clone())) {
                continue;
            }
            let mut steps = state.steps.clone();
            steps.push(edge);
            let mut names = state.names.clone();
            names.push(translator.name.clone());
            heap.push(SearchState {
                cost: state.cost + translator.cost,
                node: dst,
                props: next_props,
                steps,
                names,
            });
        }
    }

    let src_name = registry.concrete_type(src).name.clone();
    let dst_name = registry.concrete_type(target.concrete).name.clone();
    if reached_target_type {
        let constraints: Vec<String> = target
            .abstract_constraints
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Err(PlanError::PropertyMismatch {
            src: src_name,
            dst: dst_name,
            constraints: constraints.join(", "),
        })
    } else {
        Err(PlanError::NoTranslationPath {
            src: src_name,
            dst: dst_name,
        })
    }
}
