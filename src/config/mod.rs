//! # Configuration Module
//!
//! Validated run configuration built from command-line arguments.
//!
//! ## Example
//!
//! ```
//! use depviz::common::ConfigBuilder;
//! use depviz::config::VisualizeConfig;
//! use depviz::source::SourceSpec;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let graph = dir.path().join("graph.toml");
//! std::fs::write(&graph, "packages = []\n")?;
//!
//! let config = VisualizeConfig::builder()
//!     .with_package_name("app")
//!     .with_source(SourceSpec::TestFile(graph))
//!     .with_version("^1.2")
//!     .with_output(dir.path().join("app.dot"))
//!     .build()?;
//!
//! assert_eq!(config.constraint.to_string(), "^1.2");
//! # Ok(())
//! # }
//! ```

pub mod visualize;

pub use visualize::{VisualizeConfig, VisualizeConfigBuilder};
