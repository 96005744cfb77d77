use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use walkdir::WalkDir;

use super::RepositorySource;
use super::index::{self, IndexRecord};
use crate::core::{DeclaredDependency, PackageRef};
use crate::error::{DepVizError, Result};

/// Files at the index root that describe the index itself
const INDEX_METADATA_FILES: &[&str] = &["config.json", "index.json", "README.md"];

/// Registry index stored in a local directory
///
/// Package files are looked up at their canonical index path first; indexes
/// that keep files in a flat or differently nested layout are served through
/// a name lookup built by walking the directory once.
pub struct LocalIndexSource {
    root: PathBuf,
    discovered: HashMap<String, PathBuf>,
    cache: Mutex<HashMap<String, Arc<Vec<IndexRecord>>>>,
}

impl LocalIndexSource {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DepVizError::Repository {
                message: format!(
                    "local repository path is not a directory: {}",
                    root.display()
                ),
            });
        }

        let discovered = Self::discover_package_files(&root);
        debug!(
            root = %root.display(),
            packages = discovered.len(),
            "indexed local repository"
        );

        Ok(Self {
            root,
            discovered,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn discover_package_files(root: &Path) -> HashMap<String, PathBuf> {
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                let is_metadata = entry.depth() == 1
                    && INDEX_METADATA_FILES
                        .iter()
                        .any(|meta| meta.eq_ignore_ascii_case(&name));
                (!is_metadata).then(|| (name, entry.into_path()))
            })
            .collect()
    }

    fn package_file(&self, package: &str) -> Option<PathBuf> {
        let canonical = self.root.join(index::index_path(package));
        if canonical.is_file() {
            return Some(canonical);
        }
        self.discovered.get(&package.to_lowercase()).cloned()
    }

    fn records(&self, package: &str) -> Result<Arc<Vec<IndexRecord>>> {
        let key = package.to_lowercase();
        if let Some(records) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(records));
        }

        let path = self
            .package_file(package)
            .ok_or_else(|| DepVizError::PackageNotFound {
                package: package.to_string(),
            })?;
        let content = std::fs::read_to_string(&path).map_err(|e| DepVizError::FileReadError {
            path: path.clone(),
            source: e,
        })?;
        let records = Arc::new(index::parse_index_file(package, &content)?);

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&records));
        Ok(records)
    }
}

impl RepositorySource for LocalIndexSource {
    fn available_versions(&self, package: &str) -> Result<Vec<String>> {
        Ok(index::available_versions(&self.records(package)?))
    }

    fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>> {
        index::dependencies_of(&self.records(package.name())?, package.version()).ok_or_else(
            || DepVizError::PackageNotFound {
                package: package.to_string(),
            },
        )
    }

    fn describe(&self) -> String {
        format!("local index {}", self.root.display())
    }

    /// Names as published in the index records, falling back to the file name
    fn package_names(&self) -> Option<Vec<String>> {
        let mut names: Vec<String> = self
            .discovered
            .keys()
            .map(|file_name| {
                self.records(file_name)
                    .ok()
                    .and_then(|records| records.first().map(|record| record.name.clone()))
                    .unwrap_or_else(|| file_name.clone())
            })
            .collect();
        names.sort();
        names.dedup();
        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_reads_canonical_layout() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "an/yh/anyhow",
            r#"{"name":"anyhow","vers":"1.0.0","deps":[]}
{"name":"anyhow","vers":"1.0.1","deps":[{"name":"backtrace","req":"^0.3"}]}"#,
        );

        let source = LocalIndexSource::open(dir.path()).unwrap();
        assert_eq!(
            source.available_versions("anyhow").unwrap(),
            vec!["1.0.0", "1.0.1"]
        );
        assert_eq!(
            source
                .dependencies_of(&PackageRef::new("anyhow", "1.0.1"))
                .unwrap(),
            vec![DeclaredDependency::new("backtrace", "^0.3")]
        );
    }

    #[test]
    fn test_reads_flat_layout_and_skips_metadata() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config.json", r#"{"dl":"https://example.com"}"#);
        write(dir.path(), "a", r#"{"name":"a","vers":"0.1.0"}"#);
        write(dir.path(), ".git/a", "garbage");

        let source = LocalIndexSource::open(dir.path()).unwrap();
        assert_eq!(source.available_versions("a").unwrap(), vec!["0.1.0"]);
        assert!(matches!(
            source.available_versions("config.json"),
            Err(DepVizError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_lists_published_package_names() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config.json", r#"{"dl":"https://example.com"}"#);
        write(dir.path(), "in/fl/inflector", r#"{"name":"Inflector","vers":"0.11.4"}"#);
        write(dir.path(), "2/cc", r#"{"name":"cc","vers":"1.0.0"}"#);

        let source = LocalIndexSource::open(dir.path()).unwrap();
        assert_eq!(
            source.package_names(),
            Some(vec!["Inflector".to_string(), "cc".to_string()])
        );
    }

    #[test]
    fn test_unknown_version_is_not_found() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1/a", r#"{"name":"a","vers":"0.1.0"}"#);

        let source = LocalIndexSource::open(dir.path()).unwrap();
        assert!(matches!(
            source.dependencies_of(&PackageRef::new("a", "0.2.0")),
            Err(DepVizError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_open_rejects_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "file", "");
        assert!(LocalIndexSource::open(dir.path().join("file")).is_err());
    }
}
