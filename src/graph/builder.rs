use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use super::types::DependencyGraph;
use crate::core::{DeclaredDependency, Direction, FailedDependency, PackageRef};
use crate::error::{DepVizError, Result};
use crate::progress::ProgressReporter;
use crate::source::RepositorySource;
use crate::version::{self, Constraint};

/// Shared abort signal for a build
///
/// Cloned handles observe the same flag. A token created with a deadline
/// also reports cancellation once the deadline has passed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Expansion state of one package during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Visit states keyed by package, guarded by a single lock
#[derive(Debug, Default)]
struct VisitTracker {
    states: Mutex<HashMap<PackageRef, VisitState>>,
}

impl VisitTracker {
    /// Atomically move `package` from `Unvisited` to `InProgress`
    ///
    /// Returns `false` when another expansion already owns or finished it.
    fn claim(&self, package: &PackageRef) -> bool {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        match states.get(package) {
            Some(VisitState::InProgress) | Some(VisitState::Done) => false,
            Some(VisitState::Unvisited) | None => {
                states.insert(package.clone(), VisitState::InProgress);
                true
            }
        }
    }

    fn finish(&self, package: &PackageRef) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(package.clone(), VisitState::Done);
    }

    fn state(&self, package: &PackageRef) -> VisitState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(package)
            .copied()
            .unwrap_or(VisitState::Unvisited)
    }
}

/// Mutable state shared by the expansion workers of one build
#[derive(Default)]
struct BuildState {
    graph: Mutex<DependencyGraph>,
    visits: VisitTracker,
    versions: Mutex<HashMap<String, std::result::Result<Arc<Vec<String>>, String>>>,
    failures: Mutex<Vec<FailedDependency>>,
}

impl BuildState {
    fn record_failure(&self, failure: FailedDependency) {
        warn!("{failure}");
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }
}

/// Result of a completed build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub graph: DependencyGraph,
    pub root: PackageRef,
    /// Non-fatal failures, sorted
    pub failures: Vec<FailedDependency>,
}

/// Builder for constructing dependency graphs
///
/// Starting from the resolved root, packages are expanded breadth first,
/// one frontier at a time. The packages of a frontier are expanded
/// concurrently on a bounded worker pool; a package is only ever expanded by
/// the worker that claimed it.
///
/// A reverse build also seeds the first frontier with the latest version of
/// every package the source can list, so that the packages depending on the
/// root are part of the graph.
pub struct DependencyGraphBuilder<'a, S: RepositorySource + ?Sized> {
    source: &'a S,
    direction: Direction,
    jobs: usize,
    cancellation: CancellationToken,
    progress: Option<&'a ProgressReporter>,
}

impl<'a, S: RepositorySource + ?Sized> DependencyGraphBuilder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            direction: Direction::Forward,
            jobs: 1,
            cancellation: CancellationToken::new(),
            progress: None,
        }
    }

    /// Number of concurrent expansion workers (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_progress(mut self, progress: Option<&'a ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Build the dependency closure of `root_name` under `root_constraint`
    ///
    /// Fails with [`DepVizError::RootResolution`] when the root cannot be
    /// resolved or its dependencies cannot be listed, and with
    /// [`DepVizError::Cancelled`] when the cancellation token fires. Any other
    /// failure is recorded in [`BuildOutcome::failures`] and the affected
    /// declaration is skipped.
    pub fn build(&self, root_name: &str, root_constraint: &Constraint) -> Result<BuildOutcome> {
        let root = self.resolve_root(root_name, root_constraint)?;
        debug!(%root, source = %self.source.describe(), "resolved root package");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("depviz-expand-{i}"))
            .build()
            .map_err(|e| DepVizError::GraphError {
                message: format!("failed to start expansion workers: {e}"),
            })?;

        let state = BuildState::default();
        state
            .graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_node(root.clone());

        let mut seeds = BTreeSet::from([root.clone()]);
        if self.direction == Direction::Reverse {
            self.ensure_not_cancelled()?;
            let dependents = pool.install(|| self.reverse_seeds(&root, &state));
            let mut graph = state.graph.lock().unwrap_or_else(PoisonError::into_inner);
            for package in &dependents {
                graph.add_node(package.clone());
            }
            seeds.extend(dependents);
        }

        let mut frontier: Vec<PackageRef> = seeds.into_iter().collect();
        let mut depth = 0usize;

        while !frontier.is_empty() {
            self.ensure_not_cancelled()?;
            debug!(depth, packages = frontier.len(), "expanding frontier");

            let expansions: Vec<Result<Vec<PackageRef>>> = pool.install(|| {
                frontier
                    .par_iter()
                    .map(|package| self.expand(package, *package == root, &state))
                    .collect()
            });

            let mut next = BTreeSet::new();
            for expansion in expansions {
                match expansion {
                    Ok(children) => next.extend(children),
                    Err(DepVizError::Cancelled) => return Err(DepVizError::Cancelled),
                    Err(e) => {
                        return Err(DepVizError::RootResolution {
                            package: root_name.to_string(),
                            source: Box::new(e),
                        });
                    }
                }
            }

            frontier = next
                .into_iter()
                .filter(|package| state.visits.state(package) == VisitState::Unvisited)
                .collect();
            depth += 1;
        }

        let graph = state
            .graph
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut failures = state
            .failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        failures.sort();

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            failures = failures.len(),
            "dependency graph complete"
        );

        Ok(BuildOutcome {
            graph,
            root,
            failures,
        })
    }

    /// Latest version of every package the source lists, the root's name aside
    fn reverse_seeds(&self, root: &PackageRef, state: &BuildState) -> Vec<PackageRef> {
        let Some(names) = self.source.package_names() else {
            warn!(
                source = %self.source.describe(),
                "repository cannot list packages; reverse view limited to the root's closure"
            );
            return Vec::new();
        };

        let seeds: Vec<PackageRef> = names
            .into_par_iter()
            .filter(|name| name != root.name())
            .filter_map(|name| {
                let latest = self
                    .versions_of(&name, state)
                    .and_then(|available| {
                        version::latest(&name, available.as_slice()).map_err(|e| e.to_string())
                    });
                match latest {
                    Ok(version) => Some(PackageRef::new(name, version)),
                    Err(reason) => {
                        debug!(package = %name, %reason, "not seeding reverse build");
                        None
                    }
                }
            })
            .collect();

        debug!(seeds = seeds.len(), "seeded reverse build");
        seeds
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            Err(DepVizError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn resolve_root(&self, name: &str, constraint: &Constraint) -> Result<PackageRef> {
        let root_error = |source: DepVizError| DepVizError::RootResolution {
            package: name.to_string(),
            source: Box::new(source),
        };

        let available = self.source.available_versions(name).map_err(root_error)?;
        let version = version::resolve(name, constraint, &available).map_err(root_error)?;
        Ok(PackageRef::new(name, version))
    }

    /// Expand one package and return the children that still need expanding
    ///
    /// Only the root's own listing failure is returned as an error; every
    /// other problem is recorded and skipped.
    fn expand(
        &self,
        package: &PackageRef,
        is_root: bool,
        state: &BuildState,
    ) -> Result<Vec<PackageRef>> {
        self.ensure_not_cancelled()?;

        if !state.visits.claim(package) {
            return Ok(Vec::new());
        }

        let declared = match self.source.dependencies_of(package) {
            Ok(declared) => declared,
            Err(e) if is_root => return Err(e),
            Err(e) => {
                state.record_failure(FailedDependency {
                    from: package.clone(),
                    dependency: None,
                    reason: format!("could not list dependencies: {e}"),
                });
                state.visits.finish(package);
                return Ok(Vec::new());
            }
        };

        let mut children = Vec::new();
        for dependency in declared {
            let child = match self.resolve_dependency(&dependency, state) {
                Ok(child) => child,
                Err(reason) => {
                    state.record_failure(FailedDependency {
                        from: package.clone(),
                        dependency: Some(dependency),
                        reason,
                    });
                    continue;
                }
            };

            state
                .graph
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .add_edge(package.clone(), child.clone(), &dependency.constraint);

            match state.visits.state(&child) {
                VisitState::Unvisited => children.push(child),
                VisitState::InProgress | VisitState::Done => {
                    debug!(
                        from = %package,
                        to = %child,
                        "edge to visited package, not re-expanding"
                    );
                }
            }
        }

        state.visits.finish(package);
        if let Some(progress) = self.progress {
            progress.package_expanded(package);
        }
        Ok(children)
    }

    fn resolve_dependency(
        &self,
        dependency: &DeclaredDependency,
        state: &BuildState,
    ) -> std::result::Result<PackageRef, String> {
        let constraint = Constraint::parse(&dependency.constraint).map_err(|e| e.to_string())?;
        let available = self.versions_of(&dependency.name, state)?;
        let version = version::resolve(&dependency.name, &constraint, &available)
            .map_err(|e| e.to_string())?;
        Ok(PackageRef::new(dependency.name.clone(), version))
    }

    /// Available versions of `name`, queried at most once per build
    fn versions_of(
        &self,
        name: &str,
        state: &BuildState,
    ) -> std::result::Result<Arc<Vec<String>>, String> {
        if let Some(cached) = state
            .versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return cached.clone();
        }

        let fetched = self
            .source
            .available_versions(name)
            .map(Arc::new)
            .map_err(|e| e.to_string());
        state
            .versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), fetched.clone());
        fetched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::source::FixtureSource;

    fn pkg(name: &str, version: &str) -> PackageRef {
        PackageRef::new(name, version)
    }

    fn fixture(doc: &str) -> FixtureSource {
        FixtureSource::from_toml_str(doc).unwrap()
    }

    const CYCLE: &str = r#"
[[packages]]
name = "A"
version = "1.0.0"
dependencies = { B = "^1.0.0" }

[[packages]]
name = "B"
version = "1.0.0"

[[packages]]
name = "B"
version = "1.1.0"
dependencies = { A = "^1.0.0" }
"#;

    #[test]
    fn test_cycle_is_recorded_without_recursion() {
        let source = fixture(CYCLE);
        let outcome = DependencyGraphBuilder::new(&source)
            .build("A", &Constraint::Latest)
            .unwrap();

        assert_eq!(outcome.root, pkg("A", "1.0.0"));
        assert_eq!(outcome.graph.node_count(), 2);
        assert_eq!(outcome.graph.edge_count(), 2);
        assert!(outcome.failures.is_empty());

        let mut edges: Vec<_> = outcome
            .graph
            .edges()
            .into_iter()
            .map(|edge| (edge.from, edge.to))
            .collect();
        edges.sort();
        assert_eq!(
            edges,
            vec![
                (pkg("A", "1.0.0"), pkg("B", "1.1.0")),
                (pkg("B", "1.1.0"), pkg("A", "1.0.0")),
            ]
        );
    }

    #[test]
    fn test_concurrent_build_matches_sequential() {
        let doc = r#"
[[packages]]
name = "root"
version = "1.0.0"
dependencies = { a = "*", b = "*", c = "*", d = "*" }

[[packages]]
name = "a"
version = "1.0.0"
dependencies = { shared = "^1", b = "*" }

[[packages]]
name = "b"
version = "1.0.0"
dependencies = { shared = "^1" }

[[packages]]
name = "c"
version = "1.0.0"
dependencies = { shared = "^1", root = "*" }

[[packages]]
name = "d"
version = "1.0.0"
dependencies = { shared = "^1" }

[[packages]]
name = "shared"
version = "1.0.0"
dependencies = { leaf = "*" }

[[packages]]
name = "leaf"
version = "1.0.0"
"#;
        let source = fixture(doc);
        let sequential = DependencyGraphBuilder::new(&source)
            .build("root", &Constraint::Latest)
            .unwrap();
        let concurrent = DependencyGraphBuilder::new(&source)
            .with_jobs(8)
            .build("root", &Constraint::Latest)
            .unwrap();

        let mut left = sequential.graph.edges();
        let mut right = concurrent.graph.edges();
        left.sort();
        right.sort();
        assert_eq!(left, right);
        assert_eq!(concurrent.graph.node_count(), 7);
        assert_eq!(concurrent.graph.edge_count(), 11);
    }

    #[test]
    fn test_root_constraint_selects_version() {
        let source = fixture(CYCLE);
        let outcome = DependencyGraphBuilder::new(&source)
            .build("B", &Constraint::parse("1.0.0").unwrap())
            .unwrap();

        assert_eq!(outcome.root, pkg("B", "1.0.0"));
        assert_eq!(outcome.graph.node_count(), 1);
        assert_eq!(outcome.graph.edge_count(), 0);
    }

    #[test]
    fn test_unknown_root_fails() {
        let source = fixture(CYCLE);
        let result = DependencyGraphBuilder::new(&source).build("Z", &Constraint::Latest);
        assert!(matches!(result, Err(DepVizError::RootResolution { .. })));
    }

    #[test]
    fn test_unsatisfiable_root_version_fails() {
        let source = fixture(CYCLE);
        let result =
            DependencyGraphBuilder::new(&source).build("A", &Constraint::parse("9.9.9").unwrap());
        match result {
            Err(DepVizError::RootResolution { source, .. }) => {
                assert!(matches!(*source, DepVizError::VersionNotFound { .. }));
            }
            other => panic!("expected RootResolution, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_dependencies_are_skipped() {
        let doc = r#"
[[packages]]
name = "app"
version = "1.0.0"
dependencies = { missing = "^1", old = "^2", broken = "not a range", ok = "*" }

[[packages]]
name = "old"
version = "1.0.0"

[[packages]]
name = "ok"
version = "0.1.0"
"#;
        let source = fixture(doc);
        let outcome = DependencyGraphBuilder::new(&source)
            .build("app", &Constraint::Latest)
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 2);
        assert!(outcome.graph.contains(&pkg("ok", "0.1.0")));

        let failed: Vec<&str> = outcome
            .failures
            .iter()
            .filter_map(|failure| failure.dependency.as_ref())
            .map(|dep| dep.name.as_str())
            .collect();
        assert_eq!(failed, vec!["broken", "missing", "old"]);
    }

    struct FlakySource {
        inner: FixtureSource,
        listing_calls: AtomicUsize,
    }

    impl RepositorySource for FlakySource {
        fn available_versions(&self, package: &str) -> Result<Vec<String>> {
            self.inner.available_versions(package)
        }

        fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            if package.name() == "B" {
                return Err(DepVizError::Repository {
                    message: "connection reset".to_string(),
                });
            }
            self.inner.dependencies_of(package)
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_listing_failure_below_root_is_contained() {
        let source = FlakySource {
            inner: fixture(CYCLE),
            listing_calls: AtomicUsize::new(0),
        };
        let outcome = DependencyGraphBuilder::new(&source)
            .build("A", &Constraint::Latest)
            .unwrap();

        assert_eq!(outcome.graph.edge_count(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].from, pkg("B", "1.1.0"));
        assert!(outcome.failures[0].dependency.is_none());
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listing_failure_at_root_is_fatal() {
        let source = FlakySource {
            inner: fixture(CYCLE),
            listing_calls: AtomicUsize::new(0),
        };
        let result = DependencyGraphBuilder::new(&source).build("B", &Constraint::Latest);
        assert!(matches!(result, Err(DepVizError::RootResolution { .. })));
    }

    #[test]
    fn test_each_package_is_listed_once() {
        let source = FlakySource {
            inner: fixture(
                r#"
[[packages]]
name = "top"
version = "1.0.0"
dependencies = { l = "*", r = "*" }

[[packages]]
name = "l"
version = "1.0.0"
dependencies = { bottom = "*" }

[[packages]]
name = "r"
version = "1.0.0"
dependencies = { bottom = "*" }

[[packages]]
name = "bottom"
version = "1.0.0"
dependencies = { top = "*" }
"#,
            ),
            listing_calls: AtomicUsize::new(0),
        };
        let outcome = DependencyGraphBuilder::new(&source)
            .with_jobs(4)
            .build("top", &Constraint::Latest)
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 4);
        assert_eq!(outcome.graph.edge_count(), 5);
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 4);
    }

    const CHAIN: &str = r#"
[[packages]]
name = "app"
version = "1.0.0"
dependencies = { mid = "^1" }

[[packages]]
name = "mid"
version = "1.0.0"
dependencies = { leaf = "*" }

[[packages]]
name = "tool"
version = "0.1.0"

[[packages]]
name = "leaf"
version = "0.9.0"

[[packages]]
name = "leaf"
version = "1.0.0"
"#;

    #[test]
    fn test_reverse_build_includes_dependents() {
        let source = fixture(CHAIN);
        let outcome = DependencyGraphBuilder::new(&source)
            .with_direction(Direction::Reverse)
            .with_jobs(4)
            .build("leaf", &Constraint::Latest)
            .unwrap();

        assert_eq!(outcome.root, pkg("leaf", "1.0.0"));
        assert!(outcome.graph.contains(&pkg("tool", "0.1.0")));
        assert!(!outcome.graph.contains(&pkg("leaf", "0.9.0")));

        let mut edges: Vec<_> = outcome
            .graph
            .edges()
            .into_iter()
            .map(|edge| (edge.from, edge.to))
            .collect();
        edges.sort();
        assert_eq!(
            edges,
            vec![
                (pkg("app", "1.0.0"), pkg("mid", "1.0.0")),
                (pkg("mid", "1.0.0"), pkg("leaf", "1.0.0")),
            ]
        );
    }

    #[test]
    fn test_forward_build_does_not_seed() {
        let source = fixture(CHAIN);
        let outcome = DependencyGraphBuilder::new(&source)
            .build("leaf", &Constraint::Latest)
            .unwrap();
        assert_eq!(outcome.graph.node_count(), 1);
    }

    #[test]
    fn test_reverse_build_without_listing_is_root_only() {
        let source = FlakySource {
            inner: fixture(CHAIN),
            listing_calls: AtomicUsize::new(0),
        };
        let outcome = DependencyGraphBuilder::new(&source)
            .with_direction(Direction::Reverse)
            .build("leaf", &Constraint::Latest)
            .unwrap();

        assert_eq!(outcome.graph.node_count(), 1);
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_build_returns_no_graph() {
        let source = fixture(CYCLE);
        let token = CancellationToken::new();
        token.cancel();

        let result = DependencyGraphBuilder::new(&source)
            .with_cancellation(token)
            .build("A", &Constraint::Latest);
        assert!(matches!(result, Err(DepVizError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_cancels() {
        let token = CancellationToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(!CancellationToken::with_timeout(Duration::from_secs(3600)).is_cancelled());
    }

    #[test]
    fn test_visit_tracker_claims_once() {
        let tracker = VisitTracker::default();
        let a = pkg("a", "1.0.0");

        assert_eq!(tracker.state(&a), VisitState::Unvisited);
        assert!(tracker.claim(&a));
        assert!(!tracker.claim(&a));
        assert_eq!(tracker.state(&a), VisitState::InProgress);
        tracker.finish(&a);
        assert!(!tracker.claim(&a));
        assert_eq!(tracker.state(&a), VisitState::Done);
    }
}
