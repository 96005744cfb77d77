//! Name filtering and canonical ordering of a reachable subgraph

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::traversal::Reachable;
use super::types::DependencyEdge;
use crate::core::PackageRef;

/// Filtered, deterministically ordered graph handed to rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubgraphView {
    pub root: PackageRef,
    /// Sorted by `(name, version)`
    pub nodes: Vec<PackageRef>,
    /// Sorted by `(from, to)`
    pub edges: Vec<DependencyEdge>,
}

impl SubgraphView {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, package: &PackageRef) -> bool {
        self.nodes.binary_search(package).is_ok()
    }

    /// Project this view again with another filter
    pub fn reproject(&self, filter: Option<&str>) -> SubgraphView {
        project(
            &self.root,
            self.nodes.iter().cloned(),
            self.edges.iter().cloned(),
            filter,
        )
    }
}

impl Reachable {
    pub fn project(&self, filter: Option<&str>) -> SubgraphView {
        project(
            &self.root,
            self.nodes.iter().cloned(),
            self.edges.iter().cloned(),
            filter,
        )
    }
}

/// Case-insensitive substring match on the package name
fn name_matches(package: &PackageRef, needle: &str) -> bool {
    package.name.to_lowercase().contains(needle)
}

/// Keep the packages whose name contains `filter` (ignoring case)
///
/// `root` is always kept. Edges survive only when both endpoints do, and
/// are unique per `(from, to)`. Without a filter the input is only
/// deduplicated and sorted.
pub fn project(
    root: &PackageRef,
    nodes: impl IntoIterator<Item = PackageRef>,
    edges: impl IntoIterator<Item = DependencyEdge>,
    filter: Option<&str>,
) -> SubgraphView {
    let needle = filter.map(str::to_lowercase);

    let mut kept: BTreeSet<PackageRef> = nodes
        .into_iter()
        .filter(|package| {
            needle
                .as_deref()
                .is_none_or(|needle| name_matches(package, needle))
        })
        .collect();
    kept.insert(root.clone());

    let edges: BTreeMap<(PackageRef, PackageRef), DependencyEdge> = edges
        .into_iter()
        .filter(|edge| kept.contains(&edge.from) && kept.contains(&edge.to))
        .map(|edge| ((edge.from.clone(), edge.to.clone()), edge))
        .collect();

    SubgraphView {
        root: root.clone(),
        nodes: kept.into_iter().collect(),
        edges: edges.into_values().collect(),
    }
}
