//! # Repository Sources
//!
//! A repository source answers two questions for the graph builder: which
//! versions of a package exist, and what a given package version declares as
//! its dependencies. Sources that can list their packages also enable full
//! reverse-dependency views. Everything else about a repository (transport, layout,
//! caching) stays behind the [`RepositorySource`] trait.
//!
//! ## Backends
//!
//! - [`FixtureSource`]: a pre-built graph description loaded from a TOML or
//!   JSON test file
//! - [`LocalIndexSource`]: a registry index directory on disk
//! - [`HttpIndexSource`]: a sparse registry index served over HTTP
//! - [`GitIndexSource`]: a registry index repository cloned with `git`

mod fixture;
mod git;
mod http;
mod index;
mod local;

use std::path::PathBuf;

pub use fixture::FixtureSource;
pub use git::GitIndexSource;
pub use http::HttpIndexSource;
pub use index::{IndexDependency, IndexRecord, index_path, parse_index_file};
pub use local::LocalIndexSource;

use crate::cli::RepoMode;
use crate::core::{DeclaredDependency, PackageRef};
use crate::error::{DepVizError, Result};

/// Supplier of raw dependency declarations and version lists
pub trait RepositorySource: Send + Sync {
    /// Every version of `package` the repository offers, in repository order
    fn available_versions(&self, package: &str) -> Result<Vec<String>>;

    /// Dependencies declared by one resolved package
    fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>>;

    /// Short human-readable description for log lines
    fn describe(&self) -> String;

    /// Every package name the repository holds, or `None` when packages can
    /// only be looked up by name
    fn package_names(&self) -> Option<Vec<String>> {
        None
    }
}

impl<T: RepositorySource + ?Sized> RepositorySource for Box<T> {
    fn available_versions(&self, package: &str) -> Result<Vec<String>> {
        (**self).available_versions(package)
    }

    fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>> {
        (**self).dependencies_of(package)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn package_names(&self) -> Option<Vec<String>> {
        (**self).package_names()
    }
}

/// Where dependency data comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A live repository, interpreted according to `mode`
    Repository { location: String, mode: RepoMode },
    /// A literal test graph file
    TestFile(PathBuf),
}

/// Concrete repository transport after `auto` has been settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Local,
    Git,
    Http,
}

const URL_SCHEMES: &[&str] = &["http", "https", "git", "ssh"];

/// Split `scheme://rest` when `scheme` is one of the recognised URL schemes
/// and `rest` names a host
fn url_scheme(location: &str) -> Option<&str> {
    let location = location.strip_prefix("sparse+").unwrap_or(location);
    let (scheme, rest) = location.split_once("://")?;
    let scheme_known = URL_SCHEMES
        .iter()
        .any(|known| scheme.eq_ignore_ascii_case(known));
    let has_host = rest.split('/').next().is_some_and(|host| !host.is_empty());
    (scheme_known && has_host).then_some(scheme)
}

/// Whether `location` looks like a repository URL rather than a path
pub fn is_url(location: &str) -> bool {
    url_scheme(location).is_some()
}

/// Settle which transport serves `location` under `mode`
pub fn detect_repo_kind(location: &str, mode: RepoMode) -> Result<RepoKind> {
    let scheme = url_scheme(location).map(str::to_ascii_lowercase);

    match mode {
        RepoMode::Local => {
            if PathBuf::from(location).is_dir() {
                Ok(RepoKind::Local)
            } else {
                Err(DepVizError::ConfigurationError {
                    message: format!(
                        "repo-mode 'local' requires that --repo points to a directory: {location}"
                    ),
                })
            }
        }
        RepoMode::Git | RepoMode::Http => {
            if scheme.is_none() {
                return Err(DepVizError::ConfigurationError {
                    message: format!(
                        "repo-mode '{}' requires a URL --repo (got: {location})",
                        mode.as_str()
                    ),
                });
            }
            Ok(if mode == RepoMode::Git {
                RepoKind::Git
            } else {
                RepoKind::Http
            })
        }
        RepoMode::Auto => match scheme.as_deref() {
            Some("git") | Some("ssh") => Ok(RepoKind::Git),
            Some(_) if location.trim_end_matches('/').ends_with(".git") => Ok(RepoKind::Git),
            Some(_) => Ok(RepoKind::Http),
            None if PathBuf::from(location).is_dir() => Ok(RepoKind::Local),
            None => Err(DepVizError::ConfigurationError {
                message: format!("repo path does not exist: {location}"),
            }),
        },
    }
}

/// Open the backend described by `source`
pub fn open_source(source: &SourceSpec) -> Result<Box<dyn RepositorySource>> {
    match source {
        SourceSpec::TestFile(path) => Ok(Box::new(FixtureSource::from_path(path)?)),
        SourceSpec::Repository { location, mode } => match detect_repo_kind(location, *mode)? {
            RepoKind::Local => Ok(Box::new(LocalIndexSource::open(location)?)),
            RepoKind::Git => Ok(Box::new(GitIndexSource::clone_from(location)?)),
            RepoKind::Http => Ok(Box::new(HttpIndexSource::new(location)?)),
        },
    }
}
