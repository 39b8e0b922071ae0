//! Built-in algorithm signatures and implementations.

use crate::plugins::collections::{DenseVector, HashNodeMap, HashNodeSet};
use crate::plugins::graphs::{AdjacencyGraph, CsrGraph};
use crate::registry::{
    AbstractAlgorithmDef, AbstractParam, ConcreteAlgorithmDef, ConcreteParamType, Entry, ParamType,
    PluginError, StaticEntries,
};
use crate::types::{ConcreteTypeSpec, TypeSpec};
use crate::value::{ScalarType, Value};
use std::collections::{HashMap, VecDeque};

fn typed_arg<'a, T: Send + Sync + 'static>(
    args: &'a [Value],
    index: usize,
    expected: &str,
) -> Result<&'a T, PluginError> {
    args.get(index)
        .and_then(|v| v.downcast_ref::<T>())
        .ok_or_else(|| PluginError::new(format!("argument {index} must be a {expected}")))
}

/// Breadth-first traversal order from a source node.
fn bfs_iter_adjacency(args: &[Value]) -> Result<Value, PluginError> {
    let graph: &AdjacencyGraph = typed_arg(args, 0, "AdjacencyGraph")?;
    let source = args
        .get(1)
        .and_then(|v| v.as_node_id())
        .ok_or_else(|| PluginError::new("argument 1 must be a node id"))?;
    if !graph.adj.contains_key(&source) {
        return Err(PluginError::new(format!("source node {source} not in graph")));
    }
    let mut visited = vec![source];
    let mut seen: std::collections::HashSet<u64> = visited.iter().copied().collect();
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        for &(next, _) in graph.neighbors(node) {
            if seen.insert(next) {
                visited.push(next);
                queue.push_back(next);
            }
        }
    }
    Ok(Value::object(DenseVector::from_vec(
        visited.into_iter().map(|n| n as f64).collect(),
    )))
}

/// Power iteration with uniform teleport and dangling-mass redistribution.
fn pagerank_csr(args: &[Value]) -> Result<Value, PluginError> {
    let graph: &CsrGraph = typed_arg(args, 0, "CsrGraph")?;
    let damping = args
        .get(1)
        .and_then(|v| v.as_float())
        .ok_or_else(|| PluginError::new("argument 1 must be a float"))?;
    let maxiter = args
        .get(2)
        .and_then(|v| v.as_int())
        .ok_or_else(|| PluginError::new("argument 2 must be an int"))? as usize;
    let tol = args
        .get(3)
        .and_then(|v| v.as_float())
        .ok_or_else(|| PluginError::new("argument 3 must be a float"))?;

    let n = graph.num_nodes();
    if n == 0 {
        return Ok(Value::object(HashNodeMap::new([])));
    }
    let out_weight: Vec<f64> = (0..n).map(|i| graph.row(i).map(|(_, w)| w).sum()).collect();
    let mut rank = vec![1.0 / n as f64; n];
    for _ in 0..maxiter {
        let dangling: f64 = (0..n)
            .filter(|&i| out_weight[i] == 0.0)
            .map(|i| rank[i])
            .sum();
        let base = (1.0 - damping) / n as f64 + damping * dangling / n as f64;
        let mut next = vec![base; n];
        for i in 0..n {
            if out_weight[i] == 0.0 {
                continue;
            }
            let share = damping * rank[i] / out_weight[i];
            for (j, w) in graph.row(i) {
                next[j] += share * w;
            }
        }
        let delta: f64 = rank
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .sum();
        rank = next;
        if delta < tol {
            break;
        }
    }
    Ok(Value::object(HashNodeMap::new(
        graph.nodes.iter().copied().zip(rank),
    )))
}

/// Label every node with the smallest node id of its component.
fn connected_components_adjacency(args: &[Value]) -> Result<Value, PluginError> {
    let graph: &AdjacencyGraph = typed_arg(args, 0, "AdjacencyGraph")?;
    let mut label: HashMap<u64, u64> = HashMap::new();
    for &start in graph.adj.keys() {
        if label.contains_key(&start) {
            continue;
        }
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        let mut seen: std::collections::HashSet<u64> = [start].into();
        while let Some(node) = queue.pop_front() {
            for &(next, _) in graph.neighbors(node) {
                if seen.insert(next) {
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        let root = *component.iter().min().expect("component is non-empty");
        for node in component {
            label.insert(node, root);
        }
    }
    Ok(Value::object(HashNodeMap::new(
        label.into_iter().map(|(n, l)| (n, l as f64)),
    )))
}

/// Restrict a node map to the given node set.
fn nodemap_select_hash(args: &[Value]) -> Result<Value, PluginError> {
    let map: &HashNodeMap = typed_arg(args, 0, "HashNodeMap")?;
    let nodes: &HashNodeSet = typed_arg(args, 1, "HashNodeSet")?;
    Ok(Value::object(HashNodeMap::new(
        map.values
            .iter()
            .filter(|(n, _)| nodes.0.contains(n))
            .map(|(n, v)| (*n, *v)),
    )))
}

pub(crate) fn register(entries: &mut StaticEntries) {
    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new(
            "traversal.bfs_iter",
            ParamType::Abstract(TypeSpec::of("Vector")),
        )
        .with_param(AbstractParam::typed("graph", TypeSpec::of("Graph")))
        .with_param(AbstractParam::scalar("source", ScalarType::NodeId)),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "bfs_iter_adjacency",
            "traversal.bfs_iter",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("DenseVector")),
            bfs_iter_adjacency,
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of(
            "AdjacencyGraph",
        )))
        .with_param(ConcreteParamType::Scalar(ScalarType::NodeId)),
    ));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new(
            "centrality.pagerank",
            ParamType::Abstract(TypeSpec::of("NodeMap").with("dtype", "float")),
        )
        .with_param(AbstractParam::typed("graph", TypeSpec::of("Graph")))
        .with_param(AbstractParam::scalar("damping", ScalarType::Float).with_default(0.85))
        .with_param(AbstractParam::scalar("maxiter", ScalarType::Int).with_default(50i64))
        .with_param(AbstractParam::scalar("tol", ScalarType::Float).with_default(1e-5)),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "pagerank_csr",
            "centrality.pagerank",
            ConcreteParamType::Concrete(
                ConcreteTypeSpec::of("HashNodeMap").with("dtype", "float"),
            ),
            pagerank_csr,
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of("CsrGraph")))
        .with_param(ConcreteParamType::Scalar(ScalarType::Float))
        .with_param(ConcreteParamType::Scalar(ScalarType::Int))
        .with_param(ConcreteParamType::Scalar(ScalarType::Float)),
    ));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new(
            "clustering.connected_components",
            ParamType::Abstract(TypeSpec::of("NodeMap")),
        )
        .with_param(AbstractParam::typed(
            "graph",
            TypeSpec::of("Graph").with("is_directed", false),
        )),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "connected_components_adjacency",
            "clustering.connected_components",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("HashNodeMap")),
            connected_components_adjacency,
        )
        .with_param(ConcreteParamType::Concrete(
            ConcreteTypeSpec::of("AdjacencyGraph").with("is_directed", false),
        )),
    ));

    entries.push(Entry::AbstractAlgorithm(
        AbstractAlgorithmDef::new(
            "util.nodemap.select",
            ParamType::Abstract(TypeSpec::of("NodeMap")),
        )
        .with_param(AbstractParam::typed("nodemap", TypeSpec::of("NodeMap")))
        .with_param(AbstractParam::typed("nodes", TypeSpec::of("NodeSet"))),
    ));
    entries.push(Entry::ConcreteAlgorithm(
        ConcreteAlgorithmDef::new(
            "nodemap_select_hash",
            "util.nodemap.select",
            ConcreteParamType::Concrete(ConcreteTypeSpec::of("HashNodeMap")),
            nodemap_select_hash,
        )
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of(
            "HashNodeMap",
        )))
        .with_param(ConcreteParamType::Concrete(ConcreteTypeSpec::of(
            "HashNodeSet",
        ))),
    ));
}
