//! The frozen result of a dispatch decision.
//!
//! A [`Plan`] records which concrete algorithm won and the translation chain
//! feeding each argument. It holds descriptor ids only, never descriptor
//! pointers or values, so it is cheap to clone, hashable (lazy task keys are
//! built from it) and inspectable without running anything.

use crate::planner::TranslationChain;
use crate::properties::PropertyMap;
use crate::registry::{ConcreteAlgorithmId, Registry};
use crate::types::ConcreteTypeId;
use crate::value::ScalarType;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// How one bound argument reaches its parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgPlan {
    /// Scalar parameter, no translation applies.
    Scalar(ScalarType),
    /// Typed parameter fed through a (possibly empty) translation chain.
    Chain(TranslationChain),
}

impl ArgPlan {
    pub fn cost(&self) -> f64 {
        match self {
            ArgPlan::Scalar(_) => 0.0,
            ArgPlan::Chain(chain) => chain.total_cost,
        }
    }

    pub fn hops(&self) -> usize {
        match self {
            ArgPlan::Scalar(_) => 0,
            ArgPlan::Chain(chain) => chain.hops(),
        }
    }
}

/// Declared return type of the chosen implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    Concrete {
        concrete: ConcreteTypeId,
        /// Abstract property constraints the implementation declares on its
        /// result. Lazy placeholders carry these as the known properties of
        /// the pending value.
        constraints: PropertyMap,
    },
    Scalar(ScalarType),
}

/// Immutable description of one dispatch: the chosen implementation, the
/// per-argument translation chains, the summed cost, and the expected
/// return type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub algorithm: String,
    pub concrete: ConcreteAlgorithmId,
    pub concrete_name: String,
    /// Parameter name and arg plan, in signature order.
    pub args: Vec<(String, ArgPlan)>,
    pub total_cost: f64,
    pub ret: ReturnType,
}

impl Eq for Plan {}

impl Hash for Plan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.algorithm.hash(state);
        self.concrete.hash(state);
        self.args.hash(state);
        self.total_cost.to_bits().hash(state);
        self.ret.hash(state);
    }
}

impl Plan {
    /// Total hops across all argument chains, the dispatch tie-break.
    pub fn total_hops(&self) -> usize {
        self.args.iter().map(|(_, a)| a.hops()).sum()
    }

    /// Pretty-print the plan as a tree.
    pub fn describe(&self, registry: &Registry) -> String {
        let mut lines = vec![self.algorithm.clone()];
        lines.push(format!(
            "├─ impl: {} (total cost {})",
            self.concrete_name, self.total_cost
        ));
        for (name, arg) in &self.args {
            match arg {
                ArgPlan::Scalar(kind) => lines.push(format!("├─ {name}: scalar {kind}")),
                ArgPlan::Chain(chain) => {
                    lines.push(format!("├─ {name}: {}", chain.describe(registry)))
                }
            }
        }
        let ret = match &self.ret {
            ReturnType::Concrete { concrete, .. } => {
                registry.concrete_type(*concrete).name.clone()
            }
            ReturnType::Scalar(kind) => kind.to_string(),
        };
        lines.push(format!("└─ returns: {ret}"));
        lines.join("\n")
    }
}
