//! # depviz - Visualize Package Dependency Graphs
//!
//! depviz resolves a package's dependency closure from a package index and
//! renders it as a graph image. In reverse mode it shows the packages that
//! depend on the chosen package instead.
//!
//! ## Main Components
//!
//! - **Version**: Constraint parsing and highest-matching version selection
//! - **Source**: Repository backends (test graph files, local, git and HTTP
//!   registry indexes) behind the `RepositorySource` trait
//! - **Graph**: Concurrent graph construction, forward/reverse traversal,
//!   name filtering and rendering
//! - **Executor**: The end-to-end pipeline behind the `depviz` binary
//!
//! ## Usage
//!
//! ### Example: Dependencies of a Package
//!
//! ```
//! use depviz::core::Direction;
//! use depviz::graph::{DependencyGraphBuilder, GraphRenderer, reachable};
//! use depviz::source::FixtureSource;
//! use depviz::version::Constraint;
//!
//! # fn main() -> miette::Result<()> {
//! let source = FixtureSource::from_toml_str(
//!     r#"
//!     [[packages]]
//!     name = "app"
//!     version = "1.0.0"
//!     dependencies = { http = "^0.2", log = "*" }
//!
//!     [[packages]]
//!     name = "http"
//!     version = "0.2.9"
//!     dependencies = { log = "^0.4" }
//!
//!     [[packages]]
//!     name = "log"
//!     version = "0.4.20"
//!     "#,
//! )?;
//!
//! // Step 1: Build the full graph from the root
//! let outcome = DependencyGraphBuilder::new(&source)
//!     .with_jobs(4)
//!     .build("app", &Constraint::Latest)?;
//! assert!(outcome.failures.is_empty());
//!
//! // Step 2: Walk it and keep the packages whose name contains "log"
//! let view = reachable(&outcome.graph, &outcome.root, Direction::Forward)?
//!     .project(Some("log"));
//! assert_eq!(view.node_count(), 2);
//!
//! // Step 3: Emit Graphviz DOT
//! let mut dot = Vec::new();
//! GraphRenderer::new(Direction::Forward).render_dot(&view, &mut dot)?;
//! assert!(String::from_utf8_lossy(&dot).contains(r#""app@1.0.0" -> "log@0.4.20""#));
//! # Ok(())
//! # }
//! ```
//!
//! ### Example: Dependents of a Package
//!
//! ```
//! use depviz::core::{Direction, PackageRef};
//! use depviz::graph::{DependencyGraphBuilder, reachable};
//! use depviz::source::FixtureSource;
//! use depviz::version::Constraint;
//!
//! # fn main() -> miette::Result<()> {
//! let source = FixtureSource::from_toml_str(
//!     r#"
//!     [[packages]]
//!     name = "app"
//!     version = "1.0.0"
//!     dependencies = { log = "^0.4" }
//!
//!     [[packages]]
//!     name = "log"
//!     version = "0.4.20"
//!     "#,
//! )?;
//!
//! let outcome = DependencyGraphBuilder::new(&source).build("app", &Constraint::Latest)?;
//! let log = PackageRef::new("log", "0.4.20");
//! let dependents = reachable(&outcome.graph, &log, Direction::Reverse)?;
//! assert!(dependents.contains(&PackageRef::new("app", "1.0.0")));
//! # Ok(())
//! # }
//! ```

// Private modules
mod constants;
mod logging;
mod progress;
mod utils;

// Public modules
pub mod cli;
pub mod common;
pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod graph;
pub mod source;
pub mod version;

// Main entry point for the library
pub fn run() -> miette::Result<()> {
    use clap::Parser;
    use miette::WrapErr;

    use crate::cli::Cli;
    use crate::common::FromCli;
    use crate::config::VisualizeConfig;
    use crate::executor::{CommandExecutor, VisualizeExecutor};

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = VisualizeConfig::from_cli(cli).wrap_err("Invalid arguments")?;
    VisualizeExecutor::execute(config)
}
