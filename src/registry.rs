//! Plugin entry collection and the frozen registry.
//!
//! Plugins hand the builder a flat stream of [`Entry`] values through an
//! [`EntryProvider`]. Finalization interns names into dense ids, validates
//! every cross-reference, builds the per-abstract-type translation
//! multigraph and the algorithm index, and freezes the result. A frozen
//! [`Registry`] is immutable and `Send + Sync`; readers never coordinate.

use crate::properties::{self, PropertyMap};
use crate::types::{
    AbstractTypeDef, AbstractTypeId, ConcreteTypeDef, ConcreteTypeId, ConcreteTypeSpec, TypeError,
    TypeInfo, TypeSpec,
};
use crate::value::{ScalarType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TranslatorId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbstractAlgorithmId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConcreteAlgorithmId(pub(crate) u32);

/// Error raised by plugin-supplied callables (translators, algorithms,
/// wrapper constructors).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type TranslateFn = dyn Fn(&Value, &PropertyMap) -> Result<Value, PluginError> + Send + Sync;
pub type PropsTransformFn = dyn Fn(&PropertyMap) -> PropertyMap + Send + Sync;
pub type AlgorithmFn = dyn Fn(&[Value]) -> Result<Value, PluginError> + Send + Sync;
pub type ConstructFn = dyn Fn(&[Value]) -> Result<Value, PluginError> + Send + Sync;

/// A registered conversion between two concrete types of the same abstract
/// type. The callable receives the source value and the abstract properties
/// the caller requested of the result.
#[derive(Clone)]
pub struct TranslatorDef {
    pub name: String,
    pub src: String,
    pub dst: String,
    pub cost: f64,
    /// Lossless translators participate in the round-trip equality law.
    pub lossless: bool,
    pub func: Arc<TranslateFn>,
    /// How abstract properties change across the hop. Absent means
    /// pass-through.
    pub props_transform: Option<Arc<PropsTransformFn>>,
}

impl TranslatorDef {
    pub fn new(
        name: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
        func: impl Fn(&Value, &PropertyMap) -> Result<Value, PluginError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
            dst: dst.into(),
            cost: 1.0,
            lossless: true,
            func: Arc::new(func),
            props_transform: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn lossy(mut self) -> Self {
        self.lossless = false;
        self
    }

    pub fn with_props_transform(
        mut self,
        f: impl Fn(&PropertyMap) -> PropertyMap + Send + Sync + 'static,
    ) -> Self {
        self.props_transform = Some(Arc::new(f));
        self
    }

    /// Abstract properties after this hop.
    pub fn propagate(&self, props: &PropertyMap) -> PropertyMap {
        match &self.props_transform {
            Some(f) => f(props),
            None => props.clone(),
        }
    }
}

impl fmt::Debug for TranslatorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorDef")
            .field("name", &self.name)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("cost", &self.cost)
            .finish()
    }
}

/// Parameter annotation in an abstract signature.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Abstract(TypeSpec),
    Scalar(ScalarType),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Abstract(spec) => write!(f, "{spec}"),
            ParamType::Scalar(k) => write!(f, "{k}"),
        }
    }
}

#[derive(Clone)]
pub struct AbstractParam {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

impl AbstractParam {
    pub fn typed(name: impl Into<String>, spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Abstract(spec),
            default: None,
        }
    }

    pub fn scalar(name: impl Into<String>, kind: ScalarType) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Scalar(kind),
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

impl fmt::Debug for AbstractParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// An algorithm signature in terms of abstract types, keyed by dotted path
/// (`centrality.pagerank`).
#[derive(Debug, Clone)]
pub struct AbstractAlgorithmDef {
    pub name: String,
    pub params: Vec<AbstractParam>,
    pub ret: ParamType,
}

impl AbstractAlgorithmDef {
    pub fn new(name: impl Into<String>, ret: ParamType) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret,
        }
    }

    pub fn with_param(mut self, param: AbstractParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn param(&self, name: &str) -> Option<(usize, &AbstractParam)> {
        self.params
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }
}

/// Parameter annotation in a concrete implementation's signature.
#[derive(Debug, Clone, PartialEq)]
pub enum ConcreteParamType {
    Concrete(ConcreteTypeSpec),
    Scalar(ScalarType),
}

/// An implementation of a named abstract algorithm. Parameters refine the
/// abstract signature position by position.
#[derive(Clone)]
pub struct ConcreteAlgorithmDef {
    pub name: String,
    pub abstract_name: String,
    pub params: Vec<ConcreteParamType>,
    pub ret: ConcreteParamType,
    pub func: Arc<AlgorithmFn>,
}

impl ConcreteAlgorithmDef {
    pub fn new(
        name: impl Into<String>,
        abstract_name: impl Into<String>,
        ret: ConcreteParamType,
        func: impl Fn(&[Value]) -> Result<Value, PluginError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            abstract_name: abstract_name.into(),
            params: Vec::new(),
            ret,
            func: Arc::new(func),
        }
    }

    pub fn with_param(mut self, param: ConcreteParamType) -> Self {
        self.params.push(param);
        self
    }
}

impl fmt::Debug for ConcreteAlgorithmDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcreteAlgorithmDef")
            .field("name", &self.name)
            .field("abstract_name", &self.abstract_name)
            .finish()
    }
}

/// Constructs a concrete value from raw library data (an edge list from raw
/// column vectors, a node set from raw ids).
#[derive(Clone)]
pub struct WrapperDef {
    pub name: String,
    pub concrete_name: String,
    pub construct: Arc<ConstructFn>,
}

impl WrapperDef {
    pub fn new(
        name: impl Into<String>,
        concrete_name: impl Into<String>,
        construct: impl Fn(&[Value]) -> Result<Value, PluginError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            concrete_name: concrete_name.into(),
            construct: Arc::new(construct),
        }
    }
}

impl fmt::Debug for WrapperDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperDef")
            .field("name", &self.name)
            .field("concrete_name", &self.concrete_name)
            .finish()
    }
}

/// One unit of plugin registration.
#[derive(Debug, Clone)]
pub enum Entry {
    AbstractType(AbstractTypeDef),
    ConcreteType(ConcreteTypeDef),
    Translator(TranslatorDef),
    AbstractAlgorithm(AbstractAlgorithmDef),
    ConcreteAlgorithm(ConcreteAlgorithmDef),
    Wrapper(WrapperDef),
}

/// The plugin-discovery seam. Discovery itself (search paths, dynamic
/// loading) lives outside the core; the core only consumes entries.
pub trait EntryProvider {
    fn entries(&self) -> Vec<Entry>;
}

/// In-memory entry bundle, the built-in provider.
#[derive(Debug, Clone, Default)]
pub struct StaticEntries {
    entries: Vec<Entry>,
}

impl StaticEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn extend(&mut self, other: StaticEntries) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }
}

impl EntryProvider for StaticEntries {
    fn entries(&self) -> Vec<Entry> {
        self.entries.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate {kind} name: {name}")]
    Duplicate { kind: &'static str, name: String },
    #[error("concrete type {name} references unknown abstract type {abstract_name}")]
    UnknownAbstractType { name: String, abstract_name: String },
    #[error("{kind} {name} references unknown concrete type {type_name}")]
    UnknownConcreteType {
        kind: &'static str,
        name: String,
        type_name: String,
    },
    #[error("translator {name} crosses abstract types: {src} is {src_abstract}, {dst} is {dst_abstract}")]
    TranslatorCrossesAbstractTypes {
        name: String,
        src: String,
        src_abstract: String,
        dst: String,
        dst_abstract: String,
    },
    #[error("concrete algorithm {name} implements unknown abstract algorithm {abstract_name}")]
    UnknownAbstractAlgorithm { name: String, abstract_name: String },
    #[error("concrete algorithm {name} has {got} parameters but {abstract_name} declares {want}")]
    ArityMismatch {
        name: String,
        abstract_name: String,
        got: usize,
        want: usize,
    },
    #[error("concrete algorithm {name} parameter `{param}`: {reason}")]
    ParameterShape {
        name: String,
        param: String,
        reason: String,
    },
    #[error("concrete type {name}: property {property}={value} is outside the domain declared by {abstract_name}")]
    PropertyOutsideDomain {
        name: String,
        property: String,
        value: String,
        abstract_name: String,
    },
    #[error("{kind} {name}: unknown property {property} of abstract type {abstract_name}")]
    UnknownProperty {
        kind: &'static str,
        name: String,
        property: String,
        abstract_name: String,
    },
    #[error("translator {name} has negative cost {cost}")]
    NegativeCost { name: String, cost: f64 },
}

/// The frozen registry. Owns every descriptor; everything else refers to
/// descriptors through dense ids or names.
pub struct Registry {
    abstract_types: Vec<AbstractTypeDef>,
    concrete_types: Vec<ConcreteTypeDef>,
    translators: Vec<TranslatorDef>,
    abstract_algorithms: Vec<AbstractAlgorithmDef>,
    concrete_algorithms: Vec<ConcreteAlgorithmDef>,
    wrappers: Vec<WrapperDef>,

    abstract_by_name: HashMap<String, AbstractTypeId>,
    concrete_by_name: HashMap<String, ConcreteTypeId>,
    abstract_algorithm_by_name: HashMap<String, AbstractAlgorithmId>,
    /// ConcreteTypeId -> owning AbstractTypeId.
    abstract_of: Vec<AbstractTypeId>,
    /// TranslatorId -> resolved (src, dst).
    translator_endpoints: Vec<(ConcreteTypeId, ConcreteTypeId)>,
    /// Per abstract type: translator multigraph adjacency, source node ->
    /// outgoing translator edges.
    translation_graph: HashMap<AbstractTypeId, HashMap<ConcreteTypeId, Vec<TranslatorId>>>,
    /// Abstract algorithm name -> implementations.
    algorithm_index: HashMap<String, Vec<ConcreteAlgorithmId>>,
    /// (concrete type, wrapper name) -> wrapper.
    wrapper_index: HashMap<(ConcreteTypeId, String), usize>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("abstract_types", &self.abstract_types.len())
            .field("concrete_types", &self.concrete_types.len())
            .field("translators", &self.translators.len())
            .field("abstract_algorithms", &self.abstract_algorithms.len())
            .field("concrete_algorithms", &self.concrete_algorithms.len())
            .finish()
    }
}

/// Accumulates entries, then validates and freezes them into a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    abstract_types: Vec<AbstractTypeDef>,
    concrete_types: Vec<ConcreteTypeDef>,
    translators: Vec<TranslatorDef>,
    abstract_algorithms: Vec<AbstractAlgorithmDef>,
    concrete_algorithms: Vec<ConcreteAlgorithmDef>,
    wrappers: Vec<WrapperDef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, provider: &dyn EntryProvider) -> &mut Self {
        for entry in provider.entries() {
            self.register(entry);
        }
        self
    }

    pub fn register(&mut self, entry: Entry) -> &mut Self {
        match entry {
            Entry::AbstractType(def) => self.abstract_types.push(def),
            Entry::ConcreteType(def) => self.concrete_types.push(def),
            Entry::Translator(def) => self.translators.push(def),
            Entry::AbstractAlgorithm(def) => self.abstract_algorithms.push(def),
            Entry::ConcreteAlgorithm(def) => self.concrete_algorithms.push(def),
            Entry::Wrapper(def) => self.wrappers.push(def),
        }
        self
    }

    pub fn finalize(self) -> Result<Registry, RegistryError> {
        let mut abstract_by_name = HashMap::new();
        for (i, def) in self.abstract_types.iter().enumerate() {
            if abstract_by_name
                .insert(def.name.clone(), AbstractTypeId(i as u32))
                .is_some()
            {
                return Err(RegistryError::Duplicate {
                    kind: "abstract type",
                    name: def.name.clone(),
                });
            }
        }

        let mut concrete_by_name = HashMap::new();
        let mut abstract_of = Vec::with_capacity(self.concrete_types.len());
        for (i, def) in self.concrete_types.iter().enumerate() {
            if concrete_by_name
                .insert(def.name.clone(), ConcreteTypeId(i as u32))
                .is_some()
            {
                return Err(RegistryError::Duplicate {
                    kind: "concrete type",
                    name: def.name.clone(),
                });
            }
            let abstract_id = *abstract_by_name.get(&def.abstract_name).ok_or_else(|| {
                RegistryError::UnknownAbstractType {
                    name: def.name.clone(),
                    abstract_name: def.abstract_name.clone(),
                }
            })?;
            abstract_of.push(abstract_id);

            let abstract_def = &self.abstract_types[abstract_id.0 as usize];
            for (prop, value) in &def.pinned_abstract_props {
                let domain = abstract_def.property(prop).ok_or_else(|| {
                    RegistryError::UnknownProperty {
                        kind: "concrete type",
                        name: def.name.clone(),
                        property: prop.clone(),
                        abstract_name: def.abstract_name.clone(),
                    }
                })?;
                if !domain.contains(value) {
                    return Err(RegistryError::PropertyOutsideDomain {
                        name: def.name.clone(),
                        property: prop.clone(),
                        value: value.to_string(),
                        abstract_name: def.abstract_name.clone(),
                    });
                }
            }
        }

        let mut translation_graph: HashMap<AbstractTypeId, HashMap<ConcreteTypeId, Vec<TranslatorId>>> =
            HashMap::new();
        let mut translator_endpoints = Vec::with_capacity(self.translators.len());
        for (i, def) in self.translators.iter().enumerate() {
            if !(def.cost >= 0.0) {
                return Err(RegistryError::NegativeCost {
                    name: def.name.clone(),
                    cost: def.cost,
                });
            }
            let src = *concrete_by_name.get(&def.src).ok_or_else(|| {
                RegistryError::UnknownConcreteType {
                    kind: "translator",
                    name: def.name.clone(),
                    type_name: def.src.clone(),
                }
            })?;
            let dst = *concrete_by_name.get(&def.dst).ok_or_else(|| {
                RegistryError::UnknownConcreteType {
                    kind: "translator",
                    name: def.name.clone(),
                    type_name: def.dst.clone(),
                }
            })?;
            let (src_abstract, dst_abstract) =
                (abstract_of[src.0 as usize], abstract_of[dst.0 as usize]);
            if src_abstract != dst_abstract {
                return Err(RegistryError::TranslatorCrossesAbstractTypes {
                    name: def.name.clone(),
                    src: def.src.clone(),
                    src_abstract: self.abstract_types[src_abstract.0 as usize].name.clone(),
                    dst: def.dst.clone(),
                    dst_abstract: self.abstract_types[dst_abstract.0 as usize].name.clone(),
                });
            }
            translator_endpoints.push((src, dst));
            translation_graph
                .entry(src_abstract)
                .or_default()
                .entry(src)
                .or_default()
                .push(TranslatorId(i as u32));
        }
        // Deterministic edge exploration order for the planner.
        for adjacency in translation_graph.values_mut() {
            for edges in adjacency.values_mut() {
                edges.sort_by(|a, b| {
                    self.translators[a.0 as usize]
                        .name
                        .cmp(&self.translators[b.0 as usize].name)
                });
            }
        }

        let mut abstract_algorithm_by_name = HashMap::new();
        for (i, def) in self.abstract_algorithms.iter().enumerate() {
            if abstract_algorithm_by_name
                .insert(def.name.clone(), AbstractAlgorithmId(i as u32))
                .is_some()
            {
                return Err(RegistryError::Duplicate {
                    kind: "abstract algorithm",
                    name: def.name.clone(),
                });
            }
            for param in &def.params {
                if let ParamType::Abstract(spec) = &param.ty {
                    Self::check_spec_known(
                        "abstract algorithm",
                        &def.name,
                        spec,
                        &abstract_by_name,
                        &self.abstract_types,
                    )?;
                }
            }
            if let ParamType::Abstract(spec) = &def.ret {
                Self::check_spec_known(
                    "abstract algorithm",
                    &def.name,
                    spec,
                    &abstract_by_name,
                    &self.abstract_types,
                )?;
            }
        }

        let mut algorithm_index: HashMap<String, Vec<ConcreteAlgorithmId>> = HashMap::new();
        for (i, def) in self.concrete_algorithms.iter().enumerate() {
            let abstract_id = *abstract_algorithm_by_name
                .get(&def.abstract_name)
                .ok_or_else(|| RegistryError::UnknownAbstractAlgorithm {
                    name: def.name.clone(),
                    abstract_name: def.abstract_name.clone(),
                })?;
            let abstract_def = &self.abstract_algorithms[abstract_id.0 as usize];
            if def.params.len() != abstract_def.params.len() {
                return Err(RegistryError::ArityMismatch {
                    name: def.name.clone(),
                    abstract_name: def.abstract_name.clone(),
                    got: def.params.len(),
                    want: abstract_def.params.len(),
                });
            }
            for (concrete_param, abstract_param) in def.params.iter().zip(&abstract_def.params) {
                Self::check_refinement(
                    def,
                    abstract_param.name.as_str(),
                    concrete_param,
                    &abstract_param.ty,
                    &concrete_by_name,
                    &abstract_of,
                    &self.abstract_types,
                )?;
            }
            Self::check_refinement(
                def,
                "<return>",
                &def.ret,
                &abstract_def.ret,
                &concrete_by_name,
                &abstract_of,
                &self.abstract_types,
            )?;
            algorithm_index
                .entry(def.abstract_name.clone())
                .or_default()
                .push(ConcreteAlgorithmId(i as u32));
        }
        // Deterministic candidate enumeration order.
        for ids in algorithm_index.values_mut() {
            ids.sort_by(|a, b| {
                self.concrete_algorithms[a.0 as usize]
                    .name
                    .cmp(&self.concrete_algorithms[b.0 as usize].name)
            });
        }

        let mut wrapper_index = HashMap::new();
        for (i, def) in self.wrappers.iter().enumerate() {
            let concrete = *concrete_by_name.get(&def.concrete_name).ok_or_else(|| {
                RegistryError::UnknownConcreteType {
                    kind: "wrapper",
                    name: def.name.clone(),
                    type_name: def.concrete_name.clone(),
                }
            })?;
            if wrapper_index
                .insert((concrete, def.name.clone()), i)
                .is_some()
            {
                return Err(RegistryError::Duplicate {
                    kind: "wrapper",
                    name: def.name.clone(),
                });
            }
        }

        Ok(Registry {
            abstract_types: self.abstract_types,
            concrete_types: self.concrete_types,
            translators: self.translators,
            abstract_algorithms: self.abstract_algorithms,
            concrete_algorithms: self.concrete_algorithms,
            wrappers: self.wrappers,
            abstract_by_name,
            concrete_by_name,
            abstract_algorithm_by_name,
            abstract_of,
            translator_endpoints,
            translation_graph,
            algorithm_index,
            wrapper_index,
        })
    }

    fn check_spec_known(
        kind: &'static str,
        owner: &str,
        spec: &TypeSpec,
        abstract_by_name: &HashMap<String, AbstractTypeId>,
        abstract_types: &[AbstractTypeDef],
    ) -> Result<(), RegistryError> {
        let id = abstract_by_name.get(&spec.abstract_name).ok_or_else(|| {
            RegistryError::UnknownAbstractType {
                name: owner.to_string(),
                abstract_name: spec.abstract_name.clone(),
            }
        })?;
        let abstract_def = &abstract_types[id.0 as usize];
        for (prop, value) in &spec.constraints {
            let domain =
                abstract_def
                    .property(prop)
                    .ok_or_else(|| RegistryError::UnknownProperty {
                        kind,
                        name: owner.to_string(),
                        property: prop.clone(),
                        abstract_name: spec.abstract_name.clone(),
                    })?;
            if !domain.contains(value) {
                return Err(RegistryError::PropertyOutsideDomain {
                    name: owner.to_string(),
                    property: prop.clone(),
                    value: value.to_string(),
                    abstract_name: spec.abstract_name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_refinement(
        def: &ConcreteAlgorithmDef,
        param_name: &str,
        concrete_param: &ConcreteParamType,
        abstract_param: &ParamType,
        concrete_by_name: &HashMap<String, ConcreteTypeId>,
        abstract_of: &[AbstractTypeId],
        abstract_types: &[AbstractTypeDef],
    ) -> Result<(), RegistryError> {
        match (concrete_param, abstract_param) {
            (ConcreteParamType::Scalar(got), ParamType::Scalar(want)) => {
                if got != want {
                    return Err(RegistryError::ParameterShape {
                        name: def.name.clone(),
                        param: param_name.to_string(),
                        reason: format!("scalar kind {got} does not match declared {want}"),
                    });
                }
            }
            (ConcreteParamType::Concrete(cspec), ParamType::Abstract(aspec)) => {
                let concrete = *concrete_by_name.get(&cspec.concrete_name).ok_or_else(|| {
                    RegistryError::UnknownConcreteType {
                        kind: "concrete algorithm",
                        name: def.name.clone(),
                        type_name: cspec.concrete_name.clone(),
                    }
                })?;
                let owner = abstract_of[concrete.0 as usize];
                let owner_name = &abstract_types[owner.0 as usize].name;
                if *owner_name != aspec.abstract_name {
                    return Err(RegistryError::ParameterShape {
                        name: def.name.clone(),
                        param: param_name.to_string(),
                        reason: format!(
                            "{} belongs to {owner_name}, signature declares {}",
                            cspec.concrete_name, aspec.abstract_name
                        ),
                    });
                }
                if !properties::compatible(&aspec.constraints, &cspec.abstract_constraints) {
                    return Err(RegistryError::ParameterShape {
                        name: def.name.clone(),
                        param: param_name.to_string(),
                        reason: "property constraints contradict the abstract signature"
                            .to_string(),
                    });
                }
            }
            (got, want) => {
                return Err(RegistryError::ParameterShape {
                    name: def.name.clone(),
                    param: param_name.to_string(),
                    reason: format!("{got:?} cannot refine {want}"),
                });
            }
        }
        Ok(())
    }
}

impl Registry {
    pub fn abstract_type(&self, id: AbstractTypeId) -> &AbstractTypeDef {
        &self.abstract_types[id.0 as usize]
    }

    pub fn concrete_type(&self, id: ConcreteTypeId) -> &ConcreteTypeDef {
        &self.concrete_types[id.0 as usize]
    }

    pub fn translator(&self, id: TranslatorId) -> &TranslatorDef {
        &self.translators[id.0 as usize]
    }

    pub fn concrete_algorithm(&self, id: ConcreteAlgorithmId) -> &ConcreteAlgorithmDef {
        &self.concrete_algorithms[id.0 as usize]
    }

    pub fn abstract_type_id(&self, name: &str) -> Result<AbstractTypeId, TypeError> {
        self.abstract_by_name
            .get(name)
            .copied()
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))
    }

    pub fn concrete_type_id(&self, name: &str) -> Result<ConcreteTypeId, TypeError> {
        self.concrete_by_name
            .get(name)
            .copied()
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))
    }

    /// The abstract type owning a concrete type.
    pub fn abstract_of(&self, concrete: ConcreteTypeId) -> AbstractTypeId {
        self.abstract_of[concrete.0 as usize]
    }

    /// Resolved (src, dst) endpoints of a translator.
    pub fn translator_endpoints(&self, id: TranslatorId) -> (ConcreteTypeId, ConcreteTypeId) {
        self.translator_endpoints[id.0 as usize]
    }

    pub fn abstract_algorithm(&self, name: &str) -> Option<&AbstractAlgorithmDef> {
        self.abstract_algorithm_by_name
            .get(name)
            .map(|id| &self.abstract_algorithms[id.0 as usize])
    }

    pub fn implementations(&self, abstract_name: &str) -> &[ConcreteAlgorithmId] {
        self.algorithm_index
            .get(abstract_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outgoing translator edges from `src`, in name order.
    pub fn translators_from(&self, src: ConcreteTypeId) -> &[TranslatorId] {
        let abstract_id = self.abstract_of(src);
        self.translation_graph
            .get(&abstract_id)
            .and_then(|adjacency| adjacency.get(&src))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn abstract_type_names(&self) -> impl Iterator<Item = &str> {
        self.abstract_types.iter().map(|d| d.name.as_str())
    }

    pub fn concrete_type_names_of(&self, abstract_name: &str) -> Vec<&str> {
        self.concrete_types
            .iter()
            .filter(|d| d.abstract_name == abstract_name)
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn algorithm_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .abstract_algorithms
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn wrappers(&self) -> &[WrapperDef] {
        &self.wrappers
    }

    pub fn wrapper(&self, concrete_name: &str, wrapper_name: &str) -> Option<&WrapperDef> {
        let concrete = self.concrete_by_name.get(concrete_name)?;
        self.wrapper_index
            .get(&(*concrete, wrapper_name.to_string()))
            .map(|&i| &self.wrappers[i])
    }

    /// Find the unique concrete type claiming `value`.
    ///
    /// Scans registered predicates in registration order; exactly one must
    /// claim the value. Scalars are classified by signature binding, not
    /// here.
    pub fn infer_concrete_type(&self, value: &Value) -> Result<ConcreteTypeId, TypeError> {
        if !value.is_object() {
            return Err(TypeError::ScalarValue);
        }
        let mut found: Option<ConcreteTypeId> = None;
        for (i, def) in self.concrete_types.iter().enumerate() {
            if def.ops.is_typeclass_of(value) {
                if let Some(first) = found {
                    return Err(TypeError::AmbiguousType {
                        first: self.concrete_types[first.0 as usize].name.clone(),
                        second: def.name.clone(),
                    });
                }
                found = Some(ConcreteTypeId(i as u32));
            }
        }
        found.ok_or(TypeError::NoMatchingType)
    }

    /// Infer the concrete type of `value` and extract its property vectors.
    /// Declared defaults fill any abstract property the plugin left
    /// uncomputed.
    pub fn typeinfo(&self, value: &Value) -> Result<(ConcreteTypeId, TypeInfo), TypeError> {
        let concrete = self.infer_concrete_type(value)?;
        let def = self.concrete_type(concrete);
        let mut info = def.ops.typeinfo(value)?;
        let abstract_def = self.abstract_type(self.abstract_of(concrete));
        for domain in &abstract_def.properties {
            info.abstract_props
                .entry(domain.name.clone())
                .or_insert_with(|| domain.default.clone());
        }
        Ok((concrete, info))
    }
}
