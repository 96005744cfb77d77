//! # Dependency Graph Module
//!
//! Builds the package dependency graph from a repository source, walks it
//! forwards or backwards from a root, and renders the filtered result.
//!
//! ## Components
//!
//! ### Construction
//! - **DependencyGraphBuilder**: Concurrent breadth-first expansion from a
//!   root package, resolving every declared constraint
//! - **DependencyGraph**: Node arena keyed by `PackageRef`, one edge per
//!   `(from, to)` pair
//!
//! ### Querying
//! - **reachable**: Forward (dependencies) or reverse (dependents) closure
//! - **project**: Name filtering into a sorted `SubgraphView`
//!
//! ### Rendering
//! - **GraphRenderer**: DOT emission with root and cycle highlighting, and
//!   image output through Graphviz
//!
//! ## Example
//!
//! ```
//! use depviz::core::{Direction, PackageRef};
//! use depviz::graph::{DependencyGraph, GraphRenderer, reachable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let app = PackageRef::new("app", "1.0.0");
//! let log = PackageRef::new("log", "0.4.0");
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_edge(app.clone(), log.clone(), "^0.4");
//!
//! let view = reachable(&graph, &log, Direction::Reverse)?.project(None);
//! assert_eq!(view.nodes, vec![app, log]);
//!
//! let mut output = Vec::new();
//! GraphRenderer::new(Direction::Reverse).render_dot(&view, &mut output)?;
//! assert!(String::from_utf8(output)?.contains("dependents of log@0.4.0"));
//! # Ok(())
//! # }
//! ```

mod builder;
mod projector;
mod renderer;
mod traversal;
mod types;

pub use builder::{BuildOutcome, CancellationToken, DependencyGraphBuilder, VisitState};
pub use projector::{SubgraphView, project};
pub use renderer::{GraphRenderer, OutputFormat, Renderer};
pub use traversal::{Reachable, reachable};
pub use types::{DependencyEdge, DependencyGraph};
