//! Configuration constants for depviz
//!
//! This module contains the defaults and tuning values used throughout the
//! application. Most of them can be overridden through command-line flags
//! or `DEPVIZ_*` environment variables.

use std::time::Duration;

/// Progress spinner configuration
pub mod progress {
    use super::*;

    /// Duration between spinner updates
    pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

    /// Spinner frames shown while the graph is expanding
    pub const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];
}

/// Command-line defaults
pub mod defaults {
    /// Version constraint used when none is given
    pub const VERSION: &str = crate::version::LATEST;

    /// Output image written when `--output` is omitted
    pub const OUTPUT: &str = "dep_graph.png";

    /// Repository interpretation when `--repo-mode` is omitted
    pub const REPO_MODE: &str = "auto";
}

/// Remote index access
pub mod http {
    use super::*;

    /// Per-request timeout for sparse index downloads
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// User agent sent to index servers
    pub const USER_AGENT: &str = concat!("depviz/", env!("CARGO_PKG_VERSION"));
}

/// Graph rendering
pub mod render {
    /// Graphviz layout program used for image output
    pub const GRAPHVIZ_PROGRAM: &str = "dot";
}
