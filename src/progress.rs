use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::progress::{SPINNER_FRAMES, TICK_INTERVAL};
use crate::core::PackageRef;
use crate::utils::string::pluralize;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} [{elapsed_precise}]";

/// Terminal progress for one invocation
///
/// Methods take `&self` where they are called from expansion workers.
pub struct ProgressReporter {
    term: Term,
    expanded: AtomicUsize,
    current_bar: Option<ProgressBar>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            expanded: AtomicUsize::new(0),
            current_bar: None,
        }
    }

    /// Reporter only when stderr is an interactive terminal
    pub fn for_terminal() -> Option<Self> {
        Term::stderr().is_term().then(Self::new)
    }

    fn create_spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let mut frames: Vec<&str> = SPINNER_FRAMES.to_vec();
        frames.push("✓");
        pb.set_style(
            ProgressStyle::default_spinner()
                .template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&frames),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(TICK_INTERVAL);
        pb
    }

    pub fn start_resolution(&mut self, package: &str, source: &str) {
        let _ = self.term.clear_line();
        eprintln!(
            "{} Resolving {} from {}",
            style("🔍").cyan(),
            style(package).green(),
            style(source).dim()
        );
        self.expanded.store(0, Ordering::Relaxed);
        self.current_bar = Some(self.create_spinner("Expanding dependency graph..."));
    }

    pub fn package_expanded(&self, package: &PackageRef) {
        let count = self.expanded.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = self.current_bar {
            pb.set_message(format!(
                "Expanded {} {}, last: {}",
                count,
                pluralize("package", count),
                package
            ));
        }
    }

    pub fn finish_resolution(&mut self, nodes: usize, edges: usize) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
        let _ = self.term.clear_line();
        eprintln!(
            "{} Resolved {} {} and {} {}",
            style("✓").green(),
            style(nodes).yellow().bold(),
            pluralize("package", nodes),
            style(edges).yellow().bold(),
            pluralize("dependency", edges),
        );
    }

    pub fn abandon(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.abandon();
        }
    }

    pub fn start_rendering(&mut self, output: &Path) {
        self.current_bar = Some(self.create_spinner(&format!(
            "Rendering {}...",
            output.display()
        )));
    }

    pub fn finish_rendering(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }
}
