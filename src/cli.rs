use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};

use crate::constants::defaults;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "depviz",
    about = "🕸️ Visualize the dependency graph of a package",
    long_about = "depviz resolves a package's direct and transitive dependencies (or, with \
                  --reverse, the packages depending on it) from a package index or a test \
                  graph, optionally keeps only packages whose name contains a substring, and \
                  renders the result as a PNG, SVG or Graphviz DOT file.",
    version,
    disable_version_flag = true,
    group(
        ArgGroup::new("source")
            .required(true)
            .args(["repo", "test_file"])
    )
)]
pub struct Cli {
    /// Name of the package to graph
    #[arg(short, long, value_name = "NAME", env = "DEPVIZ_PACKAGE_NAME")]
    pub package_name: String,

    /// Package index to read from: a directory, a git URL or a sparse HTTP index
    #[arg(short, long, value_name = "REPO", env = "DEPVIZ_REPO")]
    pub repo: Option<String>,

    /// Test graph file (TOML or JSON) used instead of a repository
    #[arg(short, long, value_name = "FILE", env = "DEPVIZ_TEST_FILE")]
    pub test_file: Option<PathBuf>,

    /// How to interpret --repo
    #[arg(
        short = 'm',
        long,
        value_enum,
        default_value = defaults::REPO_MODE,
        env = "DEPVIZ_REPO_MODE"
    )]
    pub repo_mode: RepoMode,

    /// Version of the package: 'latest', an exact version or a range
    #[arg(
        short,
        long,
        value_name = "VERSION",
        default_value = defaults::VERSION,
        env = "DEPVIZ_VERSION"
    )]
    pub version: String,

    /// Output file; the extension selects the format (.png, .svg, .svgz, .dot)
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = defaults::OUTPUT,
        env = "DEPVIZ_OUTPUT"
    )]
    pub output: PathBuf,

    /// Keep only packages whose name contains this text (case-insensitive)
    #[arg(short, long, value_name = "TEXT", env = "DEPVIZ_FILTER")]
    pub filter: Option<String>,

    /// Graph the packages that depend on the package instead
    #[arg(long, env = "DEPVIZ_REVERSE")]
    pub reverse: bool,

    /// Show debug logging, including every dependency that failed to resolve
    #[arg(long, env = "DEPVIZ_VERBOSE")]
    pub verbose: bool,

    /// Number of packages expanded in parallel (defaults to the number of CPUs)
    #[arg(short, long, value_name = "N", env = "DEPVIZ_JOBS")]
    pub jobs: Option<usize>,

    /// Abort graph construction after this many seconds
    #[arg(long, value_name = "SECS", env = "DEPVIZ_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Print the depviz version
    #[arg(short = 'V', long = "tool-version", action = ArgAction::Version)]
    pub tool_version: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RepoMode {
    /// Decide from the shape of --repo
    #[default]
    Auto,
    /// A directory on disk
    Local,
    /// A git repository cloned with `git`
    Git,
    /// A sparse index served over HTTP
    Http,
}

impl RepoMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RepoMode::Auto => "auto",
            RepoMode::Local => "local",
            RepoMode::Git => "git",
            RepoMode::Http => "http",
        }
    }
}
