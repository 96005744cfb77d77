use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid test graph syntax in '{file}'")]
#[diagnostic(
    code(depviz::fixture_parse_error),
    help("Check the test graph syntax near the highlighted position")
)]
pub struct FixtureParseError {
    pub file: String,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[label("syntax error here")]
    pub span: Option<SourceSpan>,
    pub message: String,
}

#[derive(Error, Debug, Diagnostic)]
pub enum DepVizError {
    #[error("Invalid version constraint '{constraint}': {reason}")]
    #[diagnostic(
        code(depviz::invalid_constraint),
        help("Use 'latest', an exact version such as 1.2.3, or a range such as ^1.2 or >=1.0, <2.0")
    )]
    InvalidConstraint { constraint: String, reason: String },

    #[error("No version of '{package}' satisfies '{constraint}'")]
    #[diagnostic(
        code(depviz::version_not_found),
        help("Check the versions the repository offers for this package")
    )]
    VersionNotFound { package: String, constraint: String },

    #[error("Failed to resolve root package '{package}'")]
    #[diagnostic(
        code(depviz::root_resolution_error),
        help("The requested package or version could not be found in the repository")
    )]
    RootResolution {
        package: String,
        #[source]
        source: Box<DepVizError>,
    },

    #[error("Package '{package}' is not part of the dependency graph")]
    #[diagnostic(code(depviz::unknown_package))]
    UnknownPackage { package: String },

    #[error("Unsupported output format '{extension}'")]
    #[diagnostic(
        code(depviz::unsupported_format),
        help("Use an output file ending in .png, .svg, .svgz or .dot")
    )]
    UnsupportedFormat { extension: String },

    #[error("Package '{package}' not found in repository")]
    #[diagnostic(code(depviz::package_not_found))]
    PackageNotFound { package: String },

    #[error("Repository error: {message}")]
    #[diagnostic(
        code(depviz::repository_error),
        help("Check that the repository location is reachable and well formed")
    )]
    Repository { message: String },

    #[error("Failed to read file '{path}'")]
    #[diagnostic(
        code(depviz::io_error),
        help("Check if the file exists and you have read permissions")
    )]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    FixtureParse(Box<FixtureParseError>),

    #[error("Render error: {message}")]
    #[diagnostic(
        code(depviz::render_error),
        help("Image output requires Graphviz ('dot') on PATH; use a .dot output to skip it")
    )]
    Render { message: String },

    #[error("Dependency graph construction was cancelled")]
    #[diagnostic(
        code(depviz::cancelled),
        help("Raise --timeout if the repository is slow to answer")
    )]
    Cancelled,

    #[error("JSON serialization error")]
    #[diagnostic(
        code(depviz::json_error),
        help("This is likely an internal error - please report it")
    )]
    Json(#[from] serde_json::Error),

    #[error("IO error")]
    #[diagnostic(
        code(depviz::io_error),
        help("Check file permissions and disk space")
    )]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(depviz::config_error),
        help("Check your command arguments and configuration")
    )]
    ConfigurationError { message: String },

    #[error("Graph error: {message}")]
    #[diagnostic(
        code(depviz::graph_error),
        help("This may be an internal error with graph processing")
    )]
    GraphError { message: String },
}

pub type Result<T, E = DepVizError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use std::io;

    use miette::Diagnostic;

    use super::*;

    #[test]
    fn test_fixture_parse_error_display() {
        let error = FixtureParseError {
            file: "graph.toml".to_string(),
            source_code: NamedSource::new("graph.toml", "[[packages]\n".to_string()),
            span: Some((0, 12).into()),
            message: "unclosed table".to_string(),
        };

        assert_eq!(error.to_string(), "Invalid test graph syntax in 'graph.toml'");
    }

    #[test]
    fn test_version_not_found_display() {
        let error = DepVizError::VersionNotFound {
            package: "serde".to_string(),
            constraint: "9.9.9".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "No version of 'serde' satisfies '9.9.9'"
        );
    }

    #[test]
    fn test_root_resolution_keeps_cause() {
        let error = DepVizError::RootResolution {
            package: "app".to_string(),
            source: Box::new(DepVizError::PackageNotFound {
                package: "app".to_string(),
            }),
        };

        assert_eq!(error.to_string(), "Failed to resolve root package 'app'");
        let cause = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(
            cause.as_deref(),
            Some("Package 'app' not found in repository")
        );
    }

    #[test]
    fn test_error_codes() {
        let error = DepVizError::UnsupportedFormat {
            extension: "gif".to_string(),
        };

        assert!(error.code().is_some());
        assert!(error.help().is_some());
    }

    #[test]
    fn test_error_conversion_from_io() {
        let io_err = io::Error::other("some io error");
        let err: DepVizError = io_err.into();

        match err {
            DepVizError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_error_conversion_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let err: DepVizError = json_err.into();

        match err {
            DepVizError::Json(_) => {}
            _ => panic!("Expected Json variant"),
        }
    }
}
