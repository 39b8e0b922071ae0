//! Graph representations: edge list, hash adjacency, CSR.

use crate::plugins::isclose;
use crate::properties::{props, PropertyMap, PropertyValue};
use crate::registry::{Entry, PluginError, StaticEntries, TranslatorDef, WrapperDef};
use crate::types::{ConcreteTypeDef, ConcreteTypeOps, EqualityError, TypeError, TypeInfo};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Edge-triple representation: parallel source/destination columns plus an
/// optional weight column, the shape raw tabular data arrives in.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeListGraph {
    pub directed: bool,
    pub src: Vec<u64>,
    pub dst: Vec<u64>,
    pub weights: Option<Vec<f64>>,
}

impl EdgeListGraph {
    pub fn new(directed: bool, edges: &[(u64, u64)]) -> Self {
        Self {
            directed,
            src: edges.iter().map(|e| e.0).collect(),
            dst: edges.iter().map(|e| e.1).collect(),
            weights: None,
        }
    }

    pub fn weighted(directed: bool, edges: &[(u64, u64, f64)]) -> Self {
        Self {
            directed,
            src: edges.iter().map(|e| e.0).collect(),
            dst: edges.iter().map(|e| e.1).collect(),
            weights: Some(edges.iter().map(|e| e.2).collect()),
        }
    }

    pub fn num_edges(&self) -> usize {
        self.src.len()
    }

    /// Canonical edge → weight map; undirected edges normalize endpoint
    /// order. Missing weights count as 1.
    fn edge_map(&self) -> BTreeMap<(u64, u64), f64> {
        let mut out = BTreeMap::new();
        for (i, (&u, &v)) in self.src.iter().zip(&self.dst).enumerate() {
            let key = if self.directed || u <= v { (u, v) } else { (v, u) };
            let w = self.weights.as_ref().map(|w| w[i]).unwrap_or(1.0);
            out.insert(key, w);
        }
        out
    }
}

/// Adjacency-map representation. Undirected graphs store each edge under
/// both endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyGraph {
    pub directed: bool,
    pub weighted: bool,
    pub adj: BTreeMap<u64, Vec<(u64, f64)>>,
}

impl AdjacencyGraph {
    pub fn num_nodes(&self) -> usize {
        self.adj.len()
    }

    pub fn neighbors(&self, node: u64) -> &[(u64, f64)] {
        self.adj.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn edge_map(&self) -> BTreeMap<(u64, u64), f64> {
        let mut out = BTreeMap::new();
        for (&u, neighbors) in &self.adj {
            for &(v, w) in neighbors {
                let key = if self.directed || u <= v { (u, v) } else { (v, u) };
                out.insert(key, w);
            }
        }
        out
    }
}

/// Compressed sparse row representation. `nodes[i]` is the id of row `i`;
/// `indices` holds row positions, not ids.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrGraph {
    pub directed: bool,
    pub weighted: bool,
    pub nodes: Vec<u64>,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

impl CsrGraph {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices[self.indptr[i]..self.indptr[i + 1]]
            .iter()
            .copied()
            .zip(self.data[self.indptr[i]..self.indptr[i + 1]].iter().copied())
    }
}

fn edge_dtype(weighted: bool) -> PropertyValue {
    if weighted {
        PropertyValue::from("float")
    } else {
        PropertyValue::from("none")
    }
}

fn assert_edge_maps_equal(
    a: &BTreeMap<(u64, u64), f64>,
    b: &BTreeMap<(u64, u64), f64>,
    rel_tol: f64,
    abs_tol: f64,
) -> Result<(), EqualityError> {
    if a.len() != b.len() {
        return Err(EqualityError::new(format!(
            "edge counts differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    for ((edge, wa), (other, wb)) in a.iter().zip(b.iter()) {
        if edge != other {
            return Err(EqualityError::new(format!(
                "edge sets differ at {edge:?} vs {other:?}"
            )));
        }
        if !isclose(*wa, *wb, rel_tol, abs_tol) {
            return Err(EqualityError::new(format!(
                "weight of {edge:?} differs: {wa} vs {wb}"
            )));
        }
    }
    Ok(())
}

fn expect<'a, T: Send + Sync + 'static>(value: &'a Value, name: &str) -> Result<&'a T, TypeError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| TypeError::WrongRepresentation {
            expected: name.to_string(),
        })
}

pub struct EdgeListGraphType;

impl ConcreteTypeOps for EdgeListGraphType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<EdgeListGraph>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let g: &EdgeListGraph = expect(value, "EdgeListGraph")?;
        Ok(TypeInfo::new(
            props([
                ("is_directed", PropertyValue::Bool(g.directed)),
                ("edge_dtype", edge_dtype(g.weights.is_some())),
            ]),
            props([("num_edges", PropertyValue::Int(g.num_edges() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&EdgeListGraph, &EdgeListGraph) = (
            expect(a, "EdgeListGraph").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "EdgeListGraph").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.directed != b.directed {
            return Err(EqualityError::new("directedness differs"));
        }
        assert_edge_maps_equal(&a.edge_map(), &b.edge_map(), rel_tol, abs_tol)
    }
}

pub struct AdjacencyGraphType;

impl ConcreteTypeOps for AdjacencyGraphType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<AdjacencyGraph>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let g: &AdjacencyGraph = expect(value, "AdjacencyGraph")?;
        Ok(TypeInfo::new(
            props([
                ("is_directed", PropertyValue::Bool(g.directed)),
                ("edge_dtype", edge_dtype(g.weighted)),
            ]),
            props([("num_nodes", PropertyValue::Int(g.num_nodes() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&AdjacencyGraph, &AdjacencyGraph) = (
            expect(a, "AdjacencyGraph").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "AdjacencyGraph").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.directed != b.directed {
            return Err(EqualityError::new("directedness differs"));
        }
        assert_edge_maps_equal(&a.edge_map(), &b.edge_map(), rel_tol, abs_tol)
    }
}

pub struct CsrGraphType;

impl ConcreteTypeOps for CsrGraphType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<CsrGraph>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let g: &CsrGraph = expect(value, "CsrGraph")?;
        Ok(TypeInfo::new(
            props([
                ("is_directed", PropertyValue::Bool(g.directed)),
                ("edge_dtype", edge_dtype(g.weighted)),
            ]),
            props([("nnz", PropertyValue::Int(g.nnz() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&CsrGraph, &CsrGraph) = (
            expect(a, "CsrGraph").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "CsrGraph").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.directed != b.directed {
            return Err(EqualityError::new("directedness differs"));
        }
        let to_edges = |g: &CsrGraph| {
            let mut out = BTreeMap::new();
            for i in 0..g.num_nodes() {
                let u = g.nodes[i];
                for (j, w) in g.row(i) {
                    let v = g.nodes[j];
                    let key = if g.directed || u <= v { (u, v) } else { (v, u) };
                    out.insert(key, w);
                }
            }
            out
        };
        assert_edge_maps_equal(&to_edges(a), &to_edges(b), rel_tol, abs_tol)
    }
}

// --- translators ---

fn edgelist_to_adjacency(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let g = value
        .downcast_ref::<EdgeListGraph>()
        .ok_or_else(|| PluginError::new("expected an EdgeListGraph"))?;
    let mut adj: BTreeMap<u64, Vec<(u64, f64)>> = BTreeMap::new();
    for (i, (&u, &v)) in g.src.iter().zip(&g.dst).enumerate() {
        let w = g.weights.as_ref().map(|w| w[i]).unwrap_or(1.0);
        adj.entry(u).or_default().push((v, w));
        adj.entry(v).or_default();
        if !g.directed && u != v {
            adj.entry(v).or_default().push((u, w));
        }
    }
    for neighbors in adj.values_mut() {
        neighbors.sort_by(|a, b| a.0.cmp(&b.0));
    }
    Ok(Value::object(AdjacencyGraph {
        directed: g.directed,
        weighted: g.weights.is_some(),
        adj,
    }))
}

fn adjacency_to_edgelist(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let g = value
        .downcast_ref::<AdjacencyGraph>()
        .ok_or_else(|| PluginError::new("expected an AdjacencyGraph"))?;
    let mut src = Vec::new();
    let mut dst = Vec::new();
    let mut weights = Vec::new();
    for (&u, neighbors) in &g.adj {
        for &(v, w) in neighbors {
            // Undirected edges are stored under both endpoints; emit once.
            if !g.directed && v < u {
                continue;
            }
            src.push(u);
            dst.push(v);
            weights.push(w);
        }
    }
    Ok(Value::object(EdgeListGraph {
        directed: g.directed,
        src,
        dst,
        weights: g.weighted.then_some(weights),
    }))
}

fn adjacency_to_csr(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let g = value
        .downcast_ref::<AdjacencyGraph>()
        .ok_or_else(|| PluginError::new("expected an AdjacencyGraph"))?;
    let nodes: Vec<u64> = g.adj.keys().copied().collect();
    let position: BTreeMap<u64, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let mut indptr = Vec::with_capacity(nodes.len() + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();
    indptr.push(0);
    for node in &nodes {
        for &(v, w) in g.neighbors(*node) {
            let j = *position.get(&v).ok_or_else(|| {
                PluginError::new(format!("edge target {v} has no adjacency entry"))
            })?;
            indices.push(j);
            data.push(w);
        }
        indptr.push(indices.len());
    }
    Ok(Value::object(CsrGraph {
        directed: g.directed,
        weighted: g.weighted,
        nodes,
        indptr,
        indices,
        data,
    }))
}

fn csr_to_adjacency(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let g = value
        .downcast_ref::<CsrGraph>()
        .ok_or_else(|| PluginError::new("expected a CsrGraph"))?;
    let mut adj: BTreeMap<u64, Vec<(u64, f64)>> = BTreeMap::new();
    for (i, &u) in g.nodes.iter().enumerate() {
        let entry = adj.entry(u).or_default();
        for (j, w) in g.row(i) {
            entry.push((g.nodes[j], w));
        }
        entry.sort_by(|a, b| a.0.cmp(&b.0));
    }
    Ok(Value::object(AdjacencyGraph {
        directed: g.directed,
        weighted: g.weighted,
        adj,
    }))
}

/// Symmetrize a directed adjacency graph. Reverse edges are added with the
/// forward weight; an existing reverse edge keeps its own weight.
fn adjacency_to_undirected(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let g = value
        .downcast_ref::<AdjacencyGraph>()
        .ok_or_else(|| PluginError::new("expected an AdjacencyGraph"))?;
    let mut edges: BTreeMap<(u64, u64), f64> = BTreeMap::new();
    for (&u, neighbors) in &g.adj {
        for &(v, w) in neighbors {
            let key = if u <= v { (u, v) } else { (v, u) };
            edges.entry(key).or_insert(w);
        }
    }
    let mut adj: BTreeMap<u64, Vec<(u64, f64)>> =
        g.adj.keys().map(|&n| (n, Vec::new())).collect();
    for (&(u, v), &w) in &edges {
        adj.entry(u).or_default().push((v, w));
        if u != v {
            adj.entry(v).or_default().push((u, w));
        }
    }
    for neighbors in adj.values_mut() {
        neighbors.sort_by(|a, b| a.0.cmp(&b.0));
    }
    Ok(Value::object(AdjacencyGraph {
        directed: false,
        weighted: g.weighted,
        adj,
    }))
}

fn edge_list_wrapper(args: &[Value]) -> Result<Value, PluginError> {
    let edges = args
        .first()
        .ok_or_else(|| PluginError::new("edge_list wrapper needs an edge column"))?;
    let directed = match args.get(1) {
        Some(v) => v
            .as_bool()
            .ok_or_else(|| PluginError::new("edge_list wrapper: directed must be a bool"))?,
        None => true,
    };
    if let Some(triples) = edges.downcast_ref::<Vec<(u64, u64, f64)>>() {
        return Ok(Value::object(EdgeListGraph::weighted(directed, triples)));
    }
    if let Some(pairs) = edges.downcast_ref::<Vec<(u64, u64)>>() {
        return Ok(Value::object(EdgeListGraph::new(directed, pairs)));
    }
    Err(PluginError::new(
        "edge_list wrapper: expected Vec<(u64, u64)> or Vec<(u64, u64, f64)>",
    ))
}

pub(crate) fn register(entries: &mut StaticEntries) {
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("EdgeListGraph", "Graph", Arc::new(EdgeListGraphType))
            .with_concrete_property("num_edges"),
    ));
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("AdjacencyGraph", "Graph", Arc::new(AdjacencyGraphType))
            .with_concrete_property("num_nodes"),
    ));
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("CsrGraph", "Graph", Arc::new(CsrGraphType))
            .with_concrete_property("nnz"),
    ));

    entries.push(Entry::Translator(TranslatorDef::new(
        "edgelist_to_adjacency",
        "EdgeListGraph",
        "AdjacencyGraph",
        edgelist_to_adjacency,
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "adjacency_to_edgelist",
        "AdjacencyGraph",
        "EdgeListGraph",
        adjacency_to_edgelist,
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "adjacency_to_csr",
        "AdjacencyGraph",
        "CsrGraph",
        adjacency_to_csr,
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "csr_to_adjacency",
        "CsrGraph",
        "AdjacencyGraph",
        csr_to_adjacency,
    )));
    entries.push(Entry::Translator(
        TranslatorDef::new(
            "adjacency_to_undirected",
            "AdjacencyGraph",
            "AdjacencyGraph",
            adjacency_to_undirected,
        )
        .lossy()
        .with_props_transform(|props| {
            let mut out = props.clone();
            out.insert("is_directed".to_string(), PropertyValue::Bool(false));
            out
        }),
    ));

    entries.push(Entry::Wrapper(WrapperDef::new(
        "edge_list",
        "EdgeListGraph",
        edge_list_wrapper,
    )));
}
