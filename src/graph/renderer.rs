use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use tracing::debug;

use super::projector::SubgraphView;
use super::types::DependencyEdge;
use crate::constants::render::GRAPHVIZ_PROGRAM;
use crate::core::{Direction, PackageRef};
use crate::error::{DepVizError, Result};

// Blue-Orange Accessible Palette
mod colors {
    pub const NORMAL_NODE_FILL: &str = "#E3F2FD"; // Light blue
    pub const NORMAL_NODE_STROKE: &str = "#1976D2"; // Medium blue
    pub const ROOT_NODE_FILL: &str = "#C8E6C9"; // Light green
    pub const ROOT_NODE_STROKE: &str = "#388E3C"; // Dark green
    pub const CYCLE_NODE_FILL: &str = "#FFF3E0"; // Light orange
    pub const CYCLE_NODE_STROKE: &str = "#F57C00"; // Vibrant orange
    pub const NORMAL_EDGE: &str = "#64B5F6"; // Soft blue
    pub const CYCLE_EDGE: &str = "#FF6500"; // Deep orange
}

macro_rules! writeln_out {
    ($dst:expr) => {
        writeln!($dst).map_err(DepVizError::from)
    };
    ($dst:expr, $($arg:tt)*) => {
        writeln!($dst, $($arg)*).map_err(DepVizError::from)
    };
}

/// Produces an output file from a projected graph
pub trait Renderer {
    fn render(&self, view: &SubgraphView, output: &Path) -> Result<()>;
}

/// Output format selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
    Svgz,
    Dot,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "svgz" => Ok(Self::Svgz),
            "dot" => Ok(Self::Dot),
            _ => Err(DepVizError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Graphviz `-T` argument, `None` when the DOT text is the output
    pub fn graphviz_format(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("png"),
            Self::Svg => Some("svg"),
            Self::Svgz => Some("svgz"),
            Self::Dot => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Svgz => "svgz",
            Self::Dot => "dot",
        };
        f.write_str(name)
    }
}

pub struct GraphRenderer {
    direction: Direction,
    highlight_cycles: bool,
}

impl GraphRenderer {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            highlight_cycles: true,
        }
    }

    pub fn with_cycle_highlighting(mut self, highlight_cycles: bool) -> Self {
        self.highlight_cycles = highlight_cycles;
        self
    }

    pub fn render_dot(&self, view: &SubgraphView, output: &mut dyn Write) -> Result<()> {
        let cycle_nodes = if self.highlight_cycles {
            cycle_members(view)
        } else {
            HashSet::new()
        };

        writeln_out!(output, "digraph dependencies {{")?;
        writeln_out!(output, "    rankdir=LR;")?;
        writeln_out!(
            output,
            "    label=\"{} of {}\";",
            self.direction,
            escape(&view.root.to_string())
        )?;
        writeln_out!(output, "    labelloc=t;")?;
        writeln_out!(output, "    node [shape=box, style=\"rounded,filled\"];")?;
        writeln_out!(output)?;

        for package in &view.nodes {
            let (fill_color, stroke_color, penwidth) = if *package == view.root {
                (colors::ROOT_NODE_FILL, colors::ROOT_NODE_STROKE, 3)
            } else if cycle_nodes.contains(package) {
                (colors::CYCLE_NODE_FILL, colors::CYCLE_NODE_STROKE, 3)
            } else {
                (colors::NORMAL_NODE_FILL, colors::NORMAL_NODE_STROKE, 2)
            };

            writeln_out!(
                output,
                r#"    "{}" [label="{}\n{}", fillcolor="{}", color="{}", penwidth={}];"#,
                escape(&package.to_string()),
                escape(package.name()),
                escape(package.version()),
                fill_color,
                stroke_color,
                penwidth
            )?;
        }

        if !view.edges.is_empty() {
            writeln_out!(output)?;
        }

        for edge in &view.edges {
            let in_cycle = cycle_nodes.contains(&edge.from) && cycle_nodes.contains(&edge.to);
            let (color, penwidth) = if in_cycle {
                (colors::CYCLE_EDGE, 3)
            } else {
                (colors::NORMAL_EDGE, 2)
            };
            self.write_edge(output, edge, color, penwidth)?;
        }

        writeln_out!(output, "}}")?;
        Ok(())
    }

    // Reverse mode lays the graph out from the root towards its dependents,
    // while the arrowheads still point at the dependency.
    fn write_edge(
        &self,
        output: &mut dyn Write,
        edge: &DependencyEdge,
        color: &str,
        penwidth: u8,
    ) -> Result<()> {
        let from = escape(&edge.from.to_string());
        let to = escape(&edge.to.to_string());
        let tooltip = escape(&edge.declared_constraint);

        match self.direction {
            Direction::Forward => writeln_out!(
                output,
                r#"    "{}" -> "{}" [tooltip="{}", color="{}", penwidth={}];"#,
                from,
                to,
                tooltip,
                color,
                penwidth
            ),
            Direction::Reverse => writeln_out!(
                output,
                r#"    "{}" -> "{}" [dir=back, tooltip="{}", color="{}", penwidth={}];"#,
                to,
                from,
                tooltip,
                color,
                penwidth
            ),
        }
    }

    fn render_image(&self, dot_source: &[u8], format: &str, output: &Path) -> Result<()> {
        let program = which::which(GRAPHVIZ_PROGRAM).map_err(|_| DepVizError::Render {
            message: format!("Graphviz `{GRAPHVIZ_PROGRAM}` was not found on PATH"),
        })?;
        debug!("Running {} -T{} -o {}", program.display(), format, output.display());

        let mut child = Command::new(&program)
            .arg(format!("-T{format}"))
            .arg("-o")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot_source)?;
        }

        let result = child.wait_with_output()?;
        if !result.status.success() {
            return Err(DepVizError::Render {
                message: format!(
                    "Graphviz exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl Renderer for GraphRenderer {
    fn render(&self, view: &SubgraphView, output: &Path) -> Result<()> {
        let format = OutputFormat::from_path(output)?;

        let mut dot_source = Vec::new();
        self.render_dot(view, &mut dot_source)?;

        let directory = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Written next to the target and persisted only once complete
        let mut staged = tempfile::Builder::new()
            .prefix(".depviz_")
            .tempfile_in(directory)?;

        match format.graphviz_format() {
            None => staged.write_all(&dot_source)?,
            Some(graphviz_format) => {
                self.render_image(&dot_source, graphviz_format, staged.path())?
            }
        }

        staged.persist(output).map_err(|e| DepVizError::Render {
            message: format!("Failed to write {}: {}", output.display(), e.error),
        })?;
        debug!("Wrote {} graph to {}", format, output.display());
        Ok(())
    }
}

/// Packages on a cycle: members of a strongly connected component with more
/// than one node, or with a self-loop
fn cycle_members(view: &SubgraphView) -> HashSet<PackageRef> {
    let mut graph: DiGraph<&PackageRef, ()> = DiGraph::new();
    let indices: HashMap<&PackageRef, _> = view
        .nodes
        .iter()
        .map(|package| (package, graph.add_node(package)))
        .collect();

    let mut self_loops = HashSet::new();
    for edge in &view.edges {
        if edge.from == edge.to {
            self_loops.insert(edge.from.clone());
        }
        if let (Some(&from), Some(&to)) = (indices.get(&edge.from), indices.get(&edge.to)) {
            graph.add_edge(from, to, ());
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .flatten()
        .map(|idx| graph[idx].clone())
        .chain(self_loops)
        .collect()
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
