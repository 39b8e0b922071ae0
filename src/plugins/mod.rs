//! Built-in plugin: minimal native representations of the core abstract
//! types, translators between them, and a handful of algorithms. Enough to
//! use the resolver out of the box and to exercise every dispatch path in
//! tests.

pub mod algorithms;
pub mod collections;
pub mod graphs;

use crate::properties::PropertyDomain;
use crate::registry::{Entry, RegistryError, StaticEntries};
use crate::resolver::{Resolver, ResolverConfig};
use crate::types::AbstractTypeDef;

/// `math.isclose` semantics: relative tolerance scaled by the larger
/// magnitude, with an absolute floor.
pub(crate) fn isclose(a: f64, b: f64, rel_tol: f64, abs_tol: f64) -> bool {
    (a - b).abs() <= f64::max(rel_tol * f64::max(a.abs(), b.abs()), abs_tol)
}

/// Every entry of the built-in plugin.
pub fn builtin_entries() -> StaticEntries {
    let mut entries = StaticEntries::new();

    entries.push(Entry::AbstractType(
        AbstractTypeDef::new("Graph")
            .with_property(PropertyDomain::boolean("is_directed", true))
            .with_property(PropertyDomain::choice(
                "edge_dtype",
                ["none", "int", "float"],
                "float",
            )),
    ));
    entries.push(Entry::AbstractType(
        AbstractTypeDef::new("NodeMap")
            .with_property(PropertyDomain::choice("dtype", ["int", "float"], "float")),
    ));
    entries.push(Entry::AbstractType(
        AbstractTypeDef::new("Vector")
            .with_property(PropertyDomain::choice("dtype", ["int", "float"], "float")),
    ));
    entries.push(Entry::AbstractType(AbstractTypeDef::new("NodeSet")));

    graphs::register(&mut entries);
    collections::register(&mut entries);
    algorithms::register(&mut entries);

    entries
}

/// A resolver over the built-in plugin alone.
pub fn builtin_resolver(config: ResolverConfig) -> Result<Resolver, RegistryError> {
    Resolver::from_provider(&builtin_entries(), config)
}
