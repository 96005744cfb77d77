//! Registry index records
//!
//! Index files hold one JSON object per line, one line per published
//! version:
//!
//! ```text
//! {"name":"serde","vers":"1.0.0","deps":[{"name":"serde_derive","req":"^1.0","kind":"normal"}]}
//! ```

use serde::Deserialize;

use crate::core::DeclaredDependency;
use crate::error::{DepVizError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct IndexRecord {
    pub name: String,
    pub vers: String,
    #[serde(default)]
    pub deps: Vec<IndexDependency>,
    #[serde(default)]
    pub yanked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDependency {
    pub name: String,
    pub req: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub optional: bool,
    /// Real package name when the dependency is renamed
    #[serde(default)]
    pub package: Option<String>,
}

impl IndexDependency {
    /// Dev dependencies only test the declaring package; optional ones are
    /// gated behind features that are off by default
    pub fn propagates(&self) -> bool {
        self.kind.as_deref() != Some("dev") && !self.optional
    }

    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }
}

impl IndexRecord {
    pub fn declared_dependencies(&self) -> Vec<DeclaredDependency> {
        self.deps
            .iter()
            .filter(|dep| dep.propagates())
            .map(|dep| DeclaredDependency::new(dep.package_name(), dep.req.clone()))
            .collect()
    }
}

/// Relative location of a package's index file
///
/// Follows the registry index layout: `1/a`, `2/ab`, `3/a/abc`,
/// `se/rd/serde`.
pub fn index_path(package: &str) -> String {
    let name = package.to_lowercase();
    let prefix = |skip: usize, take: usize| name.chars().skip(skip).take(take).collect::<String>();
    match name.chars().count() {
        0 => String::new(),
        1 => format!("1/{name}"),
        2 => format!("2/{name}"),
        3 => format!("3/{}/{name}", prefix(0, 1)),
        _ => format!("{}/{}/{name}", prefix(0, 2), prefix(2, 2)),
    }
}

/// Parse the JSON Lines body of one index file
pub fn parse_index_file(package: &str, content: &str) -> Result<Vec<IndexRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            serde_json::from_str::<IndexRecord>(line).map_err(|e| DepVizError::Repository {
                message: format!(
                    "malformed index entry for '{package}' on line {}: {e}",
                    line_no + 1
                ),
            })
        })
        .collect()
}

/// Non-yanked versions in file order
pub fn available_versions(records: &[IndexRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|record| !record.yanked)
        .map(|record| record.vers.clone())
        .collect()
}

/// Declared dependencies of one version
pub fn dependencies_of(records: &[IndexRecord], version: &str) -> Option<Vec<DeclaredDependency>> {
    records
        .iter()
        .find(|record| record.vers == version)
        .map(IndexRecord::declared_dependencies)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
{"name":"app","vers":"1.0.0","deps":[{"name":"log","req":"^0.4"},{"name":"tempfile","req":"^3","kind":"dev"}]}
{"name":"app","vers":"1.1.0","deps":[{"name":"json","req":"^1","package":"serde_json"}],"yanked":true}
{"name":"app","vers":"1.2.0"}
"#;

    #[test]
    fn test_index_path_layout() {
        assert_eq!(index_path("a"), "1/a");
        assert_eq!(index_path("ab"), "2/ab");
        assert_eq!(index_path("abc"), "3/a/abc");
        assert_eq!(index_path("Serde"), "se/rd/serde");
    }

    #[test]
    fn test_parse_and_query() {
        let records = parse_index_file("app", SAMPLE).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(available_versions(&records), vec!["1.0.0", "1.2.0"]);

        let deps = dependencies_of(&records, "1.0.0").unwrap();
        assert_eq!(deps, vec![DeclaredDependency::new("log", "^0.4")]);

        let renamed = dependencies_of(&records, "1.1.0").unwrap();
        assert_eq!(renamed, vec![DeclaredDependency::new("serde_json", "^1")]);

        assert_eq!(dependencies_of(&records, "1.2.0").unwrap(), vec![]);
        assert!(dependencies_of(&records, "9.0.0").is_none());
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let err = parse_index_file("app", "{\"name\":\"app\",\"vers\":\"1.0.0\"}\nnot json\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_optional_dependencies_are_skipped() {
        let records = parse_index_file(
            "cli",
            r#"{"name":"cli","vers":"0.1.0","deps":[{"name":"color","req":"^2","optional":true},{"name":"args","req":"^4","kind":"normal"}]}"#,
        )
        .unwrap();
        assert_eq!(
            dependencies_of(&records, "0.1.0").unwrap(),
            vec![DeclaredDependency::new("args", "^4")]
        );
    }
}
