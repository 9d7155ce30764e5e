//! Command-line interface for `swarmbus`.
//!
//! This module provides the CLI commands and argument parsing for the
//! `swarmbus` binary: starting a standing bus, firing a one-shot
//! publish/request, and running a file through the normalization pipeline
//! in isolation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use swarmbus_config::BusConfig;
use swarmbus_engine::{Bus, Cardinality, RequestOptions, RequestReply};
use swarmbus_error_reporter::ExitCode;
use swarmbus_schema::SchemaCatalog;

/// swarmbus - an in-process XML-framed message bus for cooperating agents
#[derive(Parser)]
#[command(name = "swarmbus")]
#[command(about = "An in-process XML-framed message bus for cooperating agents")]
#[command(long_about = r#"
swarmbus normalizes XML messages (repair, heal, canonicalize) and routes them
between in-process listeners by root element and version, with cardinality-aware
dispatch and circuit-breaker-gated failure isolation.

EXAMPLES:
  # Start a standing bus loaded with schemas, serving until Ctrl-C
  swarmbus serve --schemas ./schemas

  # Normalize a file through the pipeline only, no bus involved
  swarmbus canon --file request.xml

  # Fire a one-shot request against a demo echo listener
  swarmbus send --file request.xml --echo cad-task --cardinality one
"#)]
#[command(version)]
pub struct Cli {
    /// Explicit path to a swarmbus.toml config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start a bus and serve until interrupted
    ///
    /// Loads schemas from the given directories, logs which namespaces were
    /// discovered, and blocks until SIGINT. The bus is closed cleanly on exit.
    ///
    /// EXAMPLES:
    ///   swarmbus serve --schemas ./schemas
    ///   swarmbus serve --schemas ./schemas --schemas ./vendor/schemas
    Serve {
        /// Directories to discover schema files from (repeatable)
        #[arg(long = "schemas")]
        schemas: Vec<PathBuf>,
    },

    /// Publish or request a single message and print the reply
    ///
    /// Starts a bus with no registered listeners, unless `--echo` is given, in
    /// which case a demo listener that echoes its input back as the reply is
    /// registered for the named root element.
    ///
    /// EXAMPLES:
    ///   swarmbus send --file request.xml --echo cad-task
    ///   swarmbus send --file request.xml --echo cad-task --cardinality all --timeout 5
    Send {
        /// Path to the XML file to publish
        #[arg(long)]
        file: PathBuf,

        /// Register a demo echo listener for this root element name
        #[arg(long)]
        echo: Option<String>,

        /// Dispatch cardinality
        #[arg(long, default_value = "one", value_parser = ["one", "any", "all"])]
        cardinality: String,

        /// Reply timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Run a file through the normalization pipeline only
    ///
    /// No bus is constructed; this is a pure repair -> heal -> correlate ->
    /// canonicalize pass over the given file, useful for inspecting the
    /// pipeline's output without involving routing.
    ///
    /// EXAMPLES:
    ///   swarmbus canon --file request.xml
    Canon {
        /// Path to the XML file to normalize
        #[arg(long)]
        file: PathBuf,
    },
}

/// Build the CLI command structure without parsing arguments.
/// Used for introspection in tests.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}

/// Main CLI execution function.
///
/// Handles all output, including errors. On success, returns `Ok(())`. On
/// error, prints a human-readable message via `swarmbus_error_reporter` and
/// returns the exit code the caller should use.
pub async fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    swarmbus_utils::logging::init_logging(cli.verbose).ok();

    let result = match cli.command {
        Commands::Serve { schemas } => run_serve(cli.config.as_deref(), schemas).await,
        Commands::Send { file, echo, cardinality, timeout } => {
            run_send(cli.config.as_deref(), file, echo, cardinality, timeout).await
        }
        Commands::Canon { file } => run_canon(file).await,
    };

    result.map_err(|err| match err.downcast::<swarmbus_utils::BusError>() {
        Ok(bus_err) => {
            eprintln!("error: {}", swarmbus_error_reporter::display_for_user(&bus_err));
            swarmbus_error_reporter::to_exit_code(&bus_err)
        }
        Err(other) => {
            eprintln!("error: {other:#}");
            ExitCode::INTERNAL
        }
    })
}

fn config_from(path: Option<&std::path::Path>) -> BusConfig {
    BusConfig::discover(path)
}

async fn run_serve(config_path: Option<&std::path::Path>, schema_dirs: Vec<PathBuf>) -> Result<()> {
    let mut config = config_from(config_path);
    if !schema_dirs.is_empty() {
        config.schema_dirs = schema_dirs
            .into_iter()
            .map(|p| camino::Utf8PathBuf::from_path_buf(p).map_err(|p| anyhow::anyhow!("non-utf8 path: {}", p.display())))
            .collect::<Result<Vec<_>>>()?;
    }

    let bus = Bus::builder().with_config(config).build();
    tracing::info!(listeners = bus.listener_count(), "bus serving");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutdown signal received, closing bus");
    bus.close().await;
    Ok(())
}

async fn run_send(
    config_path: Option<&std::path::Path>,
    file: PathBuf,
    echo: Option<String>,
    cardinality: String,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let config = config_from(config_path);
    let bus = Bus::builder().with_config(config).build();

    if let Some(root) = &echo {
        bus.register_listener(&[root.as_str()], swarmbus_registry::VersionMatch::Wildcard, 0, |xml| async move {
            Ok(Some(xml))
        });
    }

    let xml = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;

    let cardinality = match cardinality.as_str() {
        "one" => Cardinality::One,
        "any" => Cardinality::Any,
        "all" => Cardinality::All,
        other => anyhow::bail!("unknown cardinality: {other}"),
    };

    let opts = RequestOptions { timeout: timeout_secs.map(std::time::Duration::from_secs), cardinality };

    let reply = bus.request(&xml, opts).await?;
    print_reply(reply);

    bus.close().await;
    Ok(())
}

fn print_reply(reply: RequestReply) {
    match reply {
        RequestReply::One(bytes) => {
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        RequestReply::Many(replies) => {
            for bytes in replies {
                println!("{}", String::from_utf8_lossy(&bytes));
            }
        }
    }
}

async fn run_canon(file: PathBuf) -> Result<()> {
    let xml = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let processed = swarmbus_pipeline::process(&xml, None, &SchemaCatalog::empty())?;
    println!("{}", String::from_utf8_lossy(&processed.canonical_bytes));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_with_repeated_schema_dirs() {
        let cli = Cli::try_parse_from(["swarmbus", "serve", "--schemas", "a", "--schemas", "b"]).unwrap();
        match cli.command {
            Commands::Serve { schemas } => assert_eq!(schemas.len(), 2),
            _ => panic!("expected Serve"),
        }
    }

    #[test]
    fn cli_rejects_unknown_cardinality() {
        let result = Cli::try_parse_from(["swarmbus", "send", "--file", "x.xml", "--cardinality", "bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_canon() {
        let cli = Cli::try_parse_from(["swarmbus", "canon", "--file", "x.xml"]).unwrap();
        match cli.command {
            Commands::Canon { file } => assert_eq!(file, PathBuf::from("x.xml")),
            _ => panic!("expected Canon"),
        }
    }

    #[tokio::test]
    async fn canon_normalizes_a_file_without_a_bus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msg.xml");
        std::fs::write(&path, b"<cad-task>hi</cad-task>").unwrap();
        run_canon(path).await.unwrap();
    }
}
