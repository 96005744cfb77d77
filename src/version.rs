//! Version constraint parsing and resolution
//!
//! A [`Constraint`] is the version-selection expression attached to a
//! dependency declaration. Resolution picks exactly one version out of the
//! versions a repository offers for a package, using standard semantic
//! version precedence (a pre-release sorts before its release).

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use tracing::debug;

use crate::error::{DepVizError, Result};

/// Literal accepted in place of a version to mean "newest available"
pub const LATEST: &str = "latest";

/// Version-selection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The highest available version
    Latest,
    /// Exactly this version (e.g. `1.2.3`)
    Exact(Version),
    /// Highest version matching the requirement (e.g. `^1.2`, `>=1.0, <2.0`)
    Range(VersionReq),
}

impl Constraint {
    /// Parse a constraint expression
    ///
    /// A bare version is read as an exact pin, not as cargo's implicit caret
    /// requirement, so `1.0.0` never resolves to `1.4.0`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(DepVizError::InvalidConstraint {
                constraint: input.to_string(),
                reason: "constraint is empty".to_string(),
            });
        }

        if trimmed.eq_ignore_ascii_case(LATEST) {
            return Ok(Self::Latest);
        }

        if let Ok(version) = Version::parse(trimmed) {
            return Ok(Self::Exact(version));
        }

        VersionReq::parse(trimmed)
            .map(Self::Range)
            .map_err(|e| DepVizError::InvalidConstraint {
                constraint: input.to_string(),
                reason: e.to_string(),
            })
    }

    /// Whether `version` is acceptable under this constraint
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Latest => true,
            Self::Exact(v) => v == version,
            Self::Range(req) => req.matches(version),
        }
    }
}

impl FromStr for Constraint {
    type Err = DepVizError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "{LATEST}"),
            Self::Exact(v) => write!(f, "{v}"),
            Self::Range(req) => write!(f, "{req}"),
        }
    }
}

/// Pick the version of `package` to use out of `available`
///
/// Returns the matching entry of `available` verbatim. Entries that are not
/// valid semantic versions are ignored.
pub fn resolve<S: AsRef<str>>(
    package: &str,
    constraint: &Constraint,
    available: &[S],
) -> Result<String> {
    available
        .iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            match Version::parse(raw.trim()) {
                Ok(version) => Some((version, raw)),
                Err(e) => {
                    debug!(package, version = raw, error = %e, "ignoring unparseable version");
                    None
                }
            }
        })
        .filter(|(version, _)| constraint.matches(version))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.to_string())
        .ok_or_else(|| DepVizError::VersionNotFound {
            package: package.to_string(),
            constraint: constraint.to_string(),
        })
}

/// Highest semantic version in `available`, if any
pub fn latest<S: AsRef<str>>(package: &str, available: &[S]) -> Result<String> {
    resolve(package, &Constraint::Latest, available)
}
