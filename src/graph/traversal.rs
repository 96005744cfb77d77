//! Forward and reverse reachability over a built graph

use std::collections::{BTreeSet, HashSet, VecDeque};

use petgraph::Direction as Adjacency;

use super::types::{DependencyEdge, DependencyGraph};
use crate::core::{Direction, PackageRef};
use crate::error::{DepVizError, Result};

/// Packages reached from a root, plus the subgraph they induce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachable {
    pub root: PackageRef,
    pub nodes: BTreeSet<PackageRef>,
    /// Every graph edge whose endpoints are both reached, sorted
    pub edges: Vec<DependencyEdge>,
}

impl Reachable {
    pub fn contains(&self, package: &PackageRef) -> bool {
        self.nodes.contains(package)
    }
}

/// Compute the packages reachable from `root`
///
/// [`Direction::Forward`] follows dependencies, [`Direction::Reverse`]
/// follows dependents. Each package is queued at most once, so cycles
/// terminate. The returned edges are the induced subgraph: they include
/// edges between reached packages that the walk itself did not use.
pub fn reachable(
    graph: &DependencyGraph,
    root: &PackageRef,
    direction: Direction,
) -> Result<Reachable> {
    let start = graph
        .node_index(root)
        .ok_or_else(|| DepVizError::UnknownPackage {
            package: root.to_string(),
        })?;

    let adjacency = match direction {
        Direction::Forward => Adjacency::Outgoing,
        Direction::Reverse => Adjacency::Incoming,
    };

    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(current, adjacency) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let nodes: BTreeSet<PackageRef> = visited
        .into_iter()
        .filter_map(|idx| graph.package(idx).cloned())
        .collect();

    let mut edges: Vec<DependencyEdge> = graph
        .edges()
        .into_iter()
        .filter(|edge| nodes.contains(&edge.from) && nodes.contains(&edge.to))
        .collect();
    edges.sort();

    Ok(Reachable {
        root: root.clone(),
        nodes,
        edges,
    })
}
