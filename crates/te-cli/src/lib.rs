//! Toggl Track exporter CLI library.
//!
//! Wires configuration, the scrape cycle and the `/metrics` server together.

mod cli;
pub mod collector;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use collector::{Collector, CycleOutcome};
pub use config::Config;
