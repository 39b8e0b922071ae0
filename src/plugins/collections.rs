//! Node maps, vectors and node sets.

use crate::plugins::isclose;
use crate::properties::{props, PropertyMap, PropertyValue};
use crate::registry::{Entry, PluginError, StaticEntries, TranslatorDef, WrapperDef};
use crate::types::{ConcreteTypeDef, ConcreteTypeOps, EqualityError, TypeError, TypeInfo};
use crate::value::Value;
use ndarray::Array1;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// node id → value.
#[derive(Debug, Clone, PartialEq)]
pub struct HashNodeMap {
    pub values: HashMap<u64, f64>,
}

impl HashNodeMap {
    pub fn new(values: impl IntoIterator<Item = (u64, f64)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

/// Dense node map: node ids sorted ascending, values aligned by position.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseNodeMap {
    pub nodes: Vec<u64>,
    pub values: Array1<f64>,
}

/// Plain dense vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector(pub Array1<f64>);

impl DenseVector {
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashNodeSet(pub HashSet<u64>);

impl HashNodeSet {
    pub fn new(nodes: impl IntoIterator<Item = u64>) -> Self {
        Self(nodes.into_iter().collect())
    }
}

/// Logical dtype of a float payload: "int" when every value is integral.
fn dtype_of<'a>(values: impl Iterator<Item = &'a f64>) -> PropertyValue {
    let mut all_integral = true;
    for v in values {
        if v.fract() != 0.0 {
            all_integral = false;
            break;
        }
    }
    PropertyValue::from(if all_integral { "int" } else { "float" })
}

fn expect<'a, T: Send + Sync + 'static>(value: &'a Value, name: &str) -> Result<&'a T, TypeError> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| TypeError::WrongRepresentation {
            expected: name.to_string(),
        })
}

pub struct HashNodeMapType;

impl ConcreteTypeOps for HashNodeMapType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<HashNodeMap>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let m: &HashNodeMap = expect(value, "HashNodeMap")?;
        Ok(TypeInfo::new(
            props([("dtype", dtype_of(m.values.values()))]),
            props([("num_nodes", PropertyValue::Int(m.values.len() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&HashNodeMap, &HashNodeMap) = (
            expect(a, "HashNodeMap").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "HashNodeMap").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.values.len() != b.values.len() {
            return Err(EqualityError::new(format!(
                "node counts differ: {} vs {}",
                a.values.len(),
                b.values.len()
            )));
        }
        for (node, va) in &a.values {
            match b.values.get(node) {
                Some(vb) if isclose(*va, *vb, rel_tol, abs_tol) => {}
                Some(vb) => {
                    return Err(EqualityError::new(format!(
                        "value of node {node} differs: {va} vs {vb}"
                    )))
                }
                None => return Err(EqualityError::new(format!("node {node} missing"))),
            }
        }
        Ok(())
    }
}

pub struct DenseNodeMapType;

impl ConcreteTypeOps for DenseNodeMapType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<DenseNodeMap>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let m: &DenseNodeMap = expect(value, "DenseNodeMap")?;
        Ok(TypeInfo::new(
            props([("dtype", dtype_of(m.values.iter()))]),
            props([("num_nodes", PropertyValue::Int(m.nodes.len() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&DenseNodeMap, &DenseNodeMap) = (
            expect(a, "DenseNodeMap").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "DenseNodeMap").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.nodes != b.nodes {
            return Err(EqualityError::new("node sets differ"));
        }
        for (node, (va, vb)) in a.nodes.iter().zip(a.values.iter().zip(b.values.iter())) {
            if !isclose(*va, *vb, rel_tol, abs_tol) {
                return Err(EqualityError::new(format!(
                    "value of node {node} differs: {va} vs {vb}"
                )));
            }
        }
        Ok(())
    }
}

pub struct DenseVectorType;

impl ConcreteTypeOps for DenseVectorType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<DenseVector>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let v: &DenseVector = expect(value, "DenseVector")?;
        Ok(TypeInfo::new(
            props([("dtype", dtype_of(v.0.iter()))]),
            props([("len", PropertyValue::Int(v.0.len() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        rel_tol: f64,
        abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&DenseVector, &DenseVector) = (
            expect(a, "DenseVector").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "DenseVector").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.0.len() != b.0.len() {
            return Err(EqualityError::new(format!(
                "lengths differ: {} vs {}",
                a.0.len(),
                b.0.len()
            )));
        }
        for (i, (va, vb)) in a.0.iter().zip(b.0.iter()).enumerate() {
            if !isclose(*va, *vb, rel_tol, abs_tol) {
                return Err(EqualityError::new(format!(
                    "element {i} differs: {va} vs {vb}"
                )));
            }
        }
        Ok(())
    }
}

pub struct HashNodeSetType;

impl ConcreteTypeOps for HashNodeSetType {
    fn is_typeclass_of(&self, value: &Value) -> bool {
        value.downcast_ref::<HashNodeSet>().is_some()
    }

    fn typeinfo(&self, value: &Value) -> Result<TypeInfo, TypeError> {
        let s: &HashNodeSet = expect(value, "HashNodeSet")?;
        Ok(TypeInfo::new(
            PropertyMap::new(),
            props([("num_nodes", PropertyValue::Int(s.0.len() as i64))]),
        ))
    }

    fn assert_equal(
        &self,
        a: &Value,
        b: &Value,
        _rel_tol: f64,
        _abs_tol: f64,
    ) -> Result<(), EqualityError> {
        let (a, b): (&HashNodeSet, &HashNodeSet) = (
            expect(a, "HashNodeSet").map_err(|e| EqualityError::new(e.to_string()))?,
            expect(b, "HashNodeSet").map_err(|e| EqualityError::new(e.to_string()))?,
        );
        if a.0 != b.0 {
            return Err(EqualityError::new("node sets differ"));
        }
        Ok(())
    }
}

// --- translators ---

fn hash_to_dense_nodemap(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let m = value
        .downcast_ref::<HashNodeMap>()
        .ok_or_else(|| PluginError::new("expected a HashNodeMap"))?;
    let mut nodes: Vec<u64> = m.values.keys().copied().collect();
    nodes.sort_unstable();
    let values = Array1::from_vec(nodes.iter().map(|n| m.values[n]).collect());
    Ok(Value::object(DenseNodeMap { nodes, values }))
}

fn dense_to_hash_nodemap(value: &Value, _requested: &PropertyMap) -> Result<Value, PluginError> {
    let m = value
        .downcast_ref::<DenseNodeMap>()
        .ok_or_else(|| PluginError::new("expected a DenseNodeMap"))?;
    Ok(Value::object(HashNodeMap::new(
        m.nodes.iter().copied().zip(m.values.iter().copied()),
    )))
}

fn node_set_wrapper(args: &[Value]) -> Result<Value, PluginError> {
    let nodes = args
        .first()
        .and_then(|v| v.downcast_ref::<Vec<u64>>())
        .ok_or_else(|| PluginError::new("node_set wrapper: expected Vec<u64>"))?;
    Ok(Value::object(HashNodeSet::new(nodes.iter().copied())))
}

pub(crate) fn register(entries: &mut StaticEntries) {
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("HashNodeMap", "NodeMap", Arc::new(HashNodeMapType))
            .with_concrete_property("num_nodes"),
    ));
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("DenseNodeMap", "NodeMap", Arc::new(DenseNodeMapType))
            .with_concrete_property("num_nodes"),
    ));
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("DenseVector", "Vector", Arc::new(DenseVectorType))
            .with_concrete_property("len"),
    ));
    entries.push(Entry::ConcreteType(
        ConcreteTypeDef::new("HashNodeSet", "NodeSet", Arc::new(HashNodeSetType))
            .with_concrete_property("num_nodes"),
    ));

    entries.push(Entry::Translator(TranslatorDef::new(
        "hash_to_dense_nodemap",
        "HashNodeMap",
        "DenseNodeMap",
        hash_to_dense_nodemap,
    )));
    entries.push(Entry::Translator(TranslatorDef::new(
        "dense_to_hash_nodemap",
        "DenseNodeMap",
        "HashNodeMap",
        dense_to_hash_nodemap,
    )));

    entries.push(Entry::Wrapper(WrapperDef::new(
        "node_set",
        "HashNodeSet",
        node_set_wrapper,
    )));
}
