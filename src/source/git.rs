use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use super::{LocalIndexSource, RepositorySource};
use crate::core::{DeclaredDependency, PackageRef};
use crate::error::{DepVizError, Result};

/// Registry index repository fetched with a shallow `git clone`
///
/// The checkout lives in a temporary directory that is removed when the
/// source is dropped.
pub struct GitIndexSource {
    url: String,
    index: LocalIndexSource,
    _checkout: TempDir,
}

impl GitIndexSource {
    pub fn clone_from(url: &str) -> Result<Self> {
        let git = which::which("git").map_err(|_| DepVizError::Repository {
            message: "Git is not installed or not found in PATH; cannot clone repository"
                .to_string(),
        })?;

        let checkout = tempfile::Builder::new()
            .prefix("depviz_repo_")
            .tempdir()?;

        debug!(url, dest = %checkout.path().display(), "cloning index repository");
        let output = Command::new(git)
            .args(["clone", "--depth", "1", "--quiet", url])
            .arg(checkout.path())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DepVizError::Repository {
                message: format!("failed to clone repository '{url}': {}", stderr.trim()),
            });
        }

        let index = LocalIndexSource::open(checkout.path())?;
        Ok(Self {
            url: url.to_string(),
            index,
            _checkout: checkout,
        })
    }
}

impl RepositorySource for GitIndexSource {
    fn available_versions(&self, package: &str) -> Result<Vec<String>> {
        self.index.available_versions(package)
    }

    fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>> {
        self.index.dependencies_of(package)
    }

    fn describe(&self) -> String {
        format!("git index {}", self.url)
    }

    fn package_names(&self) -> Option<Vec<String>> {
        self.index.package_names()
    }
}
