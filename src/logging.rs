//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Filter used without `--verbose`
pub const QUIET_FILTER: &str = "error";

/// Filter used with `--verbose`
pub const VERBOSE_FILTER: &str = "depviz=debug";

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { VERBOSE_FILTER } else { QUIET_FILTER }
}

/// Install the global stderr subscriber; `RUST_LOG` takes precedence
///
/// Calling this more than once keeps the first subscriber.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
