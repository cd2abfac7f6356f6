//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Prometheus exporter for Toggl Track.
///
/// Polls the Toggl Track API on a fixed interval and serves the results as
/// Prometheus metrics.
#[derive(Debug, Parser)]
#[command(name = "toggl-exporter", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve `/metrics` and scrape on the configured interval (default).
    Serve,

    /// Run a single scrape cycle and print the exposition to stdout.
    Once,
}
