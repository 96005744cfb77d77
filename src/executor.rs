//! Executors that run a validated configuration end to end

use console::style;
use miette::{Result, WrapErr};
use tracing::debug;

use crate::config::VisualizeConfig;
use crate::graph::{
    CancellationToken, DependencyGraphBuilder, GraphRenderer, Renderer, SubgraphView, reachable,
};
use crate::progress::ProgressReporter;
use crate::source::open_source;
use crate::utils::string::pluralize;

/// Trait for command executors
pub trait CommandExecutor {
    type Config;

    /// Execute the command with the given configuration
    fn execute(config: Self::Config) -> Result<()>;
}

/// Resolve, walk, filter and render one package graph
///
/// The output file is only created once every earlier stage succeeded.
pub struct VisualizeExecutor;

impl VisualizeExecutor {
    /// Everything up to rendering, returned for callers that render themselves
    pub fn project(config: &VisualizeConfig) -> Result<SubgraphView> {
        let source = open_source(&config.source).wrap_err("Failed to open repository")?;

        let mut progress = ProgressReporter::for_terminal();
        if let Some(progress) = progress.as_mut() {
            progress.start_resolution(&config.package_name, &source.describe());
        }

        let cancellation = config
            .timeout
            .map(CancellationToken::with_timeout)
            .unwrap_or_default();

        let built = DependencyGraphBuilder::new(&*source)
            .with_direction(config.direction)
            .with_jobs(config.jobs)
            .with_cancellation(cancellation)
            .with_progress(progress.as_ref())
            .build(&config.package_name, &config.constraint);

        let outcome = match built {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(progress) = progress.as_mut() {
                    progress.abandon();
                }
                return Err(e).wrap_err_with(|| {
                    format!("Failed to build the dependency graph of {}", config.package_name)
                });
            }
        };

        if let Some(progress) = progress.as_mut() {
            progress.finish_resolution(outcome.graph.node_count(), outcome.graph.edge_count());
        }

        if !outcome.failures.is_empty() && !config.verbose {
            let count = outcome.failures.len();
            eprintln!(
                "{} {} {} could not be resolved and {} skipped (use --verbose for details)",
                style("⚠").yellow(),
                style(count).yellow().bold(),
                pluralize("dependency", count),
                if count == 1 { "was" } else { "were" }
            );
        }

        let reached = reachable(&outcome.graph, &outcome.root, config.direction)
            .wrap_err("Failed to traverse the dependency graph")?;
        debug!(
            direction = %config.direction,
            reached = reached.nodes.len(),
            "traversal complete"
        );

        let view = reached.project(config.filter.as_deref());
        debug!(
            nodes = view.node_count(),
            edges = view.edge_count(),
            filter = config.filter.as_deref().unwrap_or(""),
            "projection complete"
        );
        Ok(view)
    }
}

impl CommandExecutor for VisualizeExecutor {
    type Config = VisualizeConfig;

    fn execute(config: Self::Config) -> Result<()> {
        let view = Self::project(&config)?;

        eprintln!(
            "{} Rendering {} {} of {} as {}...",
            style("📊").cyan(),
            view.node_count(),
            pluralize("package", view.node_count()),
            style(&view.root).green(),
            config.format
        );

        let mut progress = ProgressReporter::for_terminal();
        if let Some(progress) = progress.as_mut() {
            progress.start_rendering(&config.output);
        }

        let rendered = GraphRenderer::new(config.direction).render(&view, &config.output);

        if let Some(progress) = progress.as_mut() {
            progress.finish_rendering();
        }
        rendered.wrap_err_with(|| format!("Failed to render {}", config.output.display()))?;

        eprintln!(
            "{} Graph written to {}",
            style("✓").green(),
            style(config.output.display()).bold()
        );
        Ok(())
    }
}
