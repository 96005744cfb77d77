//! Visualize configuration

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::common::{ConfigBuilder, FromCli};
use crate::core::Direction;
use crate::error::DepVizError;
use crate::graph::OutputFormat;
use crate::source::{SourceSpec, detect_repo_kind};
use crate::version::Constraint;

/// Fully validated settings for one depviz run
#[derive(Debug, Clone)]
pub struct VisualizeConfig {
    pub package_name: String,
    pub source: SourceSpec,
    pub constraint: Constraint,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub filter: Option<String>,
    pub direction: Direction,
    pub verbose: bool,
    pub jobs: usize,
    pub timeout: Option<Duration>,
}

impl VisualizeConfig {
    pub fn builder() -> VisualizeConfigBuilder {
        VisualizeConfigBuilder::new()
    }
}

#[derive(Default)]
pub struct VisualizeConfigBuilder {
    package_name: Option<String>,
    source: Option<SourceSpec>,
    version: Option<String>,
    output: Option<PathBuf>,
    filter: Option<String>,
    direction: Option<Direction>,
    verbose: Option<bool>,
    jobs: Option<usize>,
    timeout: Option<Duration>,
}

impl VisualizeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    pub fn with_source(mut self, source: SourceSpec) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

fn missing(field: &str) -> DepVizError {
    DepVizError::ConfigurationError {
        message: format!("Missing required field: {field}"),
    }
}

fn validate_package_name(name: &str) -> Result<(), DepVizError> {
    if name.is_empty() {
        return Err(DepVizError::ConfigurationError {
            message: "package name must not be empty".to_string(),
        });
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(DepVizError::ConfigurationError {
            message: format!(
                "package name '{name}' contains invalid characters (allowed: letters, digits, '_', '.', '-')"
            ),
        });
    }
    Ok(())
}

fn validate_source(source: &SourceSpec) -> Result<(), DepVizError> {
    match source {
        SourceSpec::Repository { location, mode } => detect_repo_kind(location, *mode).map(|_| ()),
        SourceSpec::TestFile(path) if path.is_file() => Ok(()),
        SourceSpec::TestFile(path) => Err(DepVizError::ConfigurationError {
            message: format!("test file does not exist: {}", path.display()),
        }),
    }
}

/// The format must be supported and the target directory must accept new files
fn validate_output(output: &Path) -> Result<OutputFormat, DepVizError> {
    let format = OutputFormat::from_path(output)?;

    let directory = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !directory.is_dir() {
        return Err(DepVizError::ConfigurationError {
            message: format!("output directory does not exist: {}", directory.display()),
        });
    }
    tempfile::tempfile_in(directory).map_err(|e| DepVizError::ConfigurationError {
        message: format!(
            "no write permission in output directory '{}': {e}",
            directory.display()
        ),
    })?;

    Ok(format)
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl ConfigBuilder for VisualizeConfigBuilder {
    type Config = VisualizeConfig;

    fn build(self) -> Result<Self::Config, DepVizError> {
        let package_name = self.package_name.ok_or_else(|| missing("package_name"))?;
        validate_package_name(&package_name)?;

        let source = self.source.ok_or_else(|| missing("source"))?;
        validate_source(&source)?;

        let constraint = Constraint::parse(&self.version.ok_or_else(|| missing("version"))?)?;

        let output = self.output.ok_or_else(|| missing("output"))?;
        let format = validate_output(&output)?;

        if self.jobs == Some(0) {
            return Err(DepVizError::ConfigurationError {
                message: "--jobs must be at least 1".to_string(),
            });
        }

        Ok(VisualizeConfig {
            package_name,
            source,
            constraint,
            output,
            format,
            filter: self.filter.filter(|filter| !filter.is_empty()),
            direction: self.direction.unwrap_or_default(),
            verbose: self.verbose.unwrap_or(false),
            jobs: self.jobs.unwrap_or_else(default_jobs),
            timeout: self.timeout,
        })
    }
}

impl FromCli for VisualizeConfig {
    fn from_cli(cli: Cli) -> Result<Self, DepVizError> {
        let source = match (cli.repo, cli.test_file) {
            (Some(location), None) => SourceSpec::Repository {
                location,
                mode: cli.repo_mode,
            },
            (None, Some(path)) => SourceSpec::TestFile(path),
            _ => {
                return Err(DepVizError::ConfigurationError {
                    message: "exactly one of --repo or --test-file is required".to_string(),
                });
            }
        };

        VisualizeConfig::builder()
            .with_package_name(cli.package_name)
            .with_source(source)
            .with_version(cli.version)
            .with_output(cli.output)
            .with_filter(cli.filter)
            .with_direction(Direction::from_reverse_flag(cli.reverse))
            .with_verbose(cli.verbose)
            .with_jobs(cli.jobs)
            .with_timeout(cli.timeout.map(Duration::from_secs))
            .build()
    }
}

crate::impl_try_from_cli!(VisualizeConfig);

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::cli::RepoMode;

    struct Fixture {
        dir: TempDir,
        graph: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let graph = dir.path().join("graph.toml");
        fs::write(&graph, "packages = []\n").unwrap();
        Fixture { dir, graph }
    }

    fn builder(fx: &Fixture) -> VisualizeConfigBuilder {
        VisualizeConfig::builder()
            .with_package_name("app")
            .with_source(SourceSpec::TestFile(fx.graph.clone()))
            .with_version("latest")
            .with_output(fx.dir.path().join("out.dot"))
    }

    #[test]
    fn test_minimal_config() {
        let fx = fixture();
        let config = builder(&fx).build().unwrap();

        assert_eq!(config.constraint, Constraint::Latest);
        assert_eq!(config.format, OutputFormat::Dot);
        assert_eq!(config.direction, Direction::Forward);
        assert!(config.filter.is_none());
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_missing_field() {
        let err = VisualizeConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("package_name"));
    }

    #[test]
    fn test_package_name_validation() {
        let fx = fixture();
        for name in ["serde_json", "zope.interface", "my-lib", "A1"] {
            assert!(builder(&fx).with_package_name(name).build().is_ok(), "{name}");
        }
        for name in ["", "bad name", "a/b", "ünïcode"] {
            assert!(matches!(
                builder(&fx).with_package_name(name).build(),
                Err(DepVizError::ConfigurationError { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        let fx = fixture();
        assert!(matches!(
            builder(&fx).with_version("not-a-version").build(),
            Err(DepVizError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_output_validation() {
        let fx = fixture();
        assert!(matches!(
            builder(&fx).with_output(fx.dir.path().join("out.gif")).build(),
            Err(DepVizError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            builder(&fx)
                .with_output(fx.dir.path().join("missing").join("out.png"))
                .build(),
            Err(DepVizError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_local_mode_needs_directory() {
        let fx = fixture();
        let source = SourceSpec::Repository {
            location: fx.dir.path().join("nope").display().to_string(),
            mode: RepoMode::Local,
        };
        assert!(builder(&fx).with_source(source).build().is_err());
    }

    #[test]
    fn test_git_mode_needs_url() {
        let fx = fixture();
        let source = SourceSpec::Repository {
            location: fx.dir.path().display().to_string(),
            mode: RepoMode::Git,
        };
        let err = builder(&fx).with_source(source).build().unwrap_err();
        assert!(err.to_string().contains("requires a URL"));
    }

    #[test]
    fn test_missing_test_file() {
        let fx = fixture();
        let source = SourceSpec::TestFile(fx.dir.path().join("absent.toml"));
        assert!(builder(&fx).with_source(source).build().is_err());
    }

    #[test]
    fn test_empty_filter_is_no_filter() {
        let fx = fixture();
        let config = builder(&fx).with_filter(Some(String::new())).build().unwrap();
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let fx = fixture();
        assert!(builder(&fx).with_jobs(Some(0)).build().is_err());
    }

    #[test]
    fn test_from_cli() {
        use clap::Parser;

        let fx = fixture();
        let output = fx.dir.path().join("graph.svg");
        let cli = Cli::try_parse_from([
            "depviz",
            "-p",
            "app",
            "-t",
            fx.graph.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-v",
            "^1",
            "--reverse",
            "-f",
            "lib",
        ])
        .unwrap();

        let config = VisualizeConfig::try_from(cli).unwrap();
        assert_eq!(config.format, OutputFormat::Svg);
        assert_eq!(config.direction, Direction::Reverse);
        assert_eq!(config.filter.as_deref(), Some("lib"));
        assert_eq!(config.source, SourceSpec::TestFile(fx.graph.clone()));
    }
}
