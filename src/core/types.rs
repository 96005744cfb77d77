//! Core type definitions
//!
//! This module contains the basic data structures used throughout the
//! application, with minimal logic - focusing on data representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolved identity of a package instance; the unit of graph node identity
///
/// Ordering is lexicographic by `(name, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A dependency as declared by a package, before resolution
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub name: String,
    pub constraint: String,
}

impl DeclaredDependency {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
        }
    }
}

/// A dependency declaration that could not be queried or resolved
///
/// `dependency` is `None` when the repository could not list the
/// dependencies of `from` at all.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FailedDependency {
    pub from: PackageRef,
    pub dependency: Option<DeclaredDependency>,
    pub reason: String,
}

impl fmt::Display for FailedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dependency {
            Some(dep) => write!(
                f,
                "{} -> {} ({}): {}",
                self.from, dep.name, dep.constraint, self.reason
            ),
            None => write!(f, "{}: {}", self.from, self.reason),
        }
    }
}

/// Which way a traversal follows dependency edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Packages the root depends on
    #[default]
    Forward,
    /// Packages depending on the root
    Reverse,
}

impl Direction {
    pub fn from_reverse_flag(reverse: bool) -> Self {
        if reverse { Self::Reverse } else { Self::Forward }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "dependencies"),
            Direction::Reverse => write!(f, "dependents"),
        }
    }
}
