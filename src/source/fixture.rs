use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use miette::{NamedSource, SourceSpan};
use serde::Deserialize;

use super::RepositorySource;
use crate::core::{DeclaredDependency, PackageRef};
use crate::error::{DepVizError, FixtureParseError, Result};

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    #[serde(default)]
    packages: Vec<FixturePackage>,
}

#[derive(Debug, Deserialize)]
struct FixturePackage {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Deterministic source backed by a pre-built graph description
///
/// ```toml
/// [[packages]]
/// name = "A"
/// version = "1.0.0"
/// dependencies = { B = "^1.0.0" }
/// ```
///
/// The same shape is accepted as JSON when the file ends in `.json`.
#[derive(Debug)]
pub struct FixtureSource {
    origin: PathBuf,
    versions: HashMap<String, Vec<String>>,
    dependencies: HashMap<PackageRef, Vec<DeclaredDependency>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixtureFormat {
    Toml,
    Json,
}

impl FixtureFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl FixtureSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DepVizError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file = path.display().to_string();
        let document = match FixtureFormat::from_path(path) {
            FixtureFormat::Toml => parse_toml(&file, &content)?,
            FixtureFormat::Json => parse_json(&file, &content)?,
        };

        Self::from_document(path.to_path_buf(), document)
    }

    /// Build from TOML text without touching the filesystem
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let document = parse_toml("<inline>", content)?;
        Self::from_document(PathBuf::from("<inline>"), document)
    }

    fn from_document(origin: PathBuf, document: FixtureDocument) -> Result<Self> {
        let mut versions: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependencies = HashMap::new();

        for package in document.packages {
            let id = PackageRef::new(package.name.clone(), package.version.clone());
            let declared = package
                .dependencies
                .into_iter()
                .map(|(name, constraint)| DeclaredDependency::new(name, constraint))
                .collect();

            if dependencies.insert(id.clone(), declared).is_some() {
                return Err(DepVizError::Repository {
                    message: format!("test graph declares {id} more than once"),
                });
            }
            versions.entry(package.name).or_default().push(package.version);
        }

        Ok(Self {
            origin,
            versions,
            dependencies,
        })
    }

    pub fn package_count(&self) -> usize {
        self.dependencies.len()
    }
}

impl RepositorySource for FixtureSource {
    fn available_versions(&self, package: &str) -> Result<Vec<String>> {
        self.versions
            .get(package)
            .cloned()
            .ok_or_else(|| DepVizError::PackageNotFound {
                package: package.to_string(),
            })
    }

    fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>> {
        self.dependencies
            .get(package)
            .cloned()
            .ok_or_else(|| DepVizError::PackageNotFound {
                package: package.to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("test graph {}", self.origin.display())
    }

    fn package_names(&self) -> Option<Vec<String>> {
        let mut names: Vec<String> = self.versions.keys().cloned().collect();
        names.sort();
        Some(names)
    }
}

fn parse_toml(file: &str, content: &str) -> Result<FixtureDocument> {
    toml::from_str(content).map_err(|e| {
        let span = e
            .span()
            .map(|span| SourceSpan::new(span.start.into(), span.end - span.start));
        parse_error(file, content, span, e.message().to_string())
    })
}

fn parse_json(file: &str, content: &str) -> Result<FixtureDocument> {
    serde_json::from_str(content).map_err(|e| {
        let span = line_column_offset(content, e.line(), e.column()).map(|offset| {
            let len = if offset < content.len() { 1 } else { 0 };
            SourceSpan::new(offset.into(), len)
        });
        parse_error(file, content, span, e.to_string())
    })
}

fn parse_error(
    file: &str,
    content: &str,
    span: Option<SourceSpan>,
    message: String,
) -> DepVizError {
    DepVizError::FixtureParse(Box::new(FixtureParseError {
        file: file.to_string(),
        source_code: NamedSource::new(file, content.to_string()),
        span,
        message,
    }))
}

/// Byte offset of a 1-based line and column
fn line_column_offset(content: &str, line: usize, column: usize) -> Option<usize> {
    let line_start: usize = content
        .split_inclusive('\n')
        .take(line.checked_sub(1)?)
        .map(str::len)
        .sum();
    Some((line_start + column.saturating_sub(1)).min(content.len()))
}
