//! Core graph types
//!
//! This module contains the fundamental data structures used in the dependency
//! graph.

use std::collections::HashMap;

use petgraph::Direction as Adjacency;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::core::PackageRef;

/// A resolved dependency: `from` depends on `to`, as selected by
/// `declared_constraint`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DependencyEdge {
    pub from: PackageRef,
    pub to: PackageRef,
    pub declared_constraint: String,
}

impl DependencyEdge {
    pub fn new(from: PackageRef, to: PackageRef, declared_constraint: impl Into<String>) -> Self {
        Self {
            from,
            to,
            declared_constraint: declared_constraint.into(),
        }
    }

    pub fn endpoints(&self) -> (&PackageRef, &PackageRef) {
        (&self.from, &self.to)
    }
}

/// Directed package graph
///
/// Nodes live in a petgraph arena and are addressed by value through an
/// index map, so the graph never holds references between packages. Both
/// outgoing and incoming adjacency are available, and cycles are allowed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<PackageRef, String>,
    indices: HashMap<PackageRef, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `package` if absent and return its index
    pub fn add_node(&mut self, package: PackageRef) -> NodeIndex {
        if let Some(&idx) = self.indices.get(&package) {
            return idx;
        }
        let idx = self.graph.add_node(package.clone());
        self.indices.insert(package, idx);
        idx
    }

    /// Record `from -> to`, inserting missing endpoints
    ///
    /// Edges are unique per `(from, to)` pair; adding an existing pair is a
    /// no-op that keeps the first constraint. Returns whether a new edge was
    /// created.
    pub fn add_edge(&mut self, from: PackageRef, to: PackageRef, constraint: &str) -> bool {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return false;
        }
        self.graph.add_edge(from_idx, to_idx, constraint.to_string());
        true
    }

    pub fn contains(&self, package: &PackageRef) -> bool {
        self.indices.contains_key(package)
    }

    pub fn node_index(&self, package: &PackageRef) -> Option<NodeIndex> {
        self.indices.get(package).copied()
    }

    pub fn package(&self, idx: NodeIndex) -> Option<&PackageRef> {
        self.graph.node_weight(idx)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageRef> {
        self.graph.node_weights()
    }

    /// Neighbours of `idx` along outgoing (dependencies) or incoming
    /// (dependents) edges
    pub fn neighbors(
        &self,
        idx: NodeIndex,
        adjacency: Adjacency,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, adjacency)
    }

    fn edge(&self, idx: EdgeIndex) -> Option<DependencyEdge> {
        let (source, target) = self.graph.edge_endpoints(idx)?;
        Some(DependencyEdge::new(
            self.graph[source].clone(),
            self.graph[target].clone(),
            self.graph[idx].clone(),
        ))
    }

    /// Every edge, in insertion order
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.graph
            .edge_indices()
            .filter_map(|idx| self.edge(idx))
            .collect()
    }

    /// Outgoing edges of `package`
    pub fn dependencies_of(&self, package: &PackageRef) -> Vec<DependencyEdge> {
        self.node_index(package)
            .map(|idx| {
                self.graph
                    .edges(idx)
                    .filter_map(|edge| self.edge(edge.id()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Incoming edges of `package`
    pub fn dependents_of(&self, package: &PackageRef) -> Vec<DependencyEdge> {
        self.node_index(package)
            .map(|idx| {
                self.graph
                    .edges_directed(idx, Adjacency::Incoming)
                    .filter_map(|edge| self.edge(edge.id()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Underlying petgraph graph, edge weights being declared constraints
    pub fn inner(&self) -> &DiGraph<PackageRef, String> {
        &self.graph
    }
}
