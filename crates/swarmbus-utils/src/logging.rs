//! Structured logging setup for the bus and its binaries.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the global `tracing` subscriber.
///
/// Honors `RUST_LOG` when set; otherwise defaults to `swarmbus=info,warn` (or
/// `swarmbus=debug,info` when `verbose` is set). Safe to call more than once
/// per process — later calls are no-ops if a subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("swarmbus=debug,info")
            } else {
                EnvFilter::try_new("swarmbus=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_target(verbose)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_ansi(use_color())
        .compact();

    let _ = tracing_subscriber::registry().with(env_filter).with(layer).try_init();

    Ok(())
}

/// Span covering one full `process()` call through the normalization pipeline.
pub fn pipeline_span(root_hint: &str) -> tracing::Span {
    span!(Level::INFO, "pipeline_process", root = root_hint)
}

/// Span covering one dispatch of a message to a single listener.
pub fn dispatch_span(root: &str, version: &str) -> tracing::Span {
    span!(Level::INFO, "dispatch", root, version)
}
