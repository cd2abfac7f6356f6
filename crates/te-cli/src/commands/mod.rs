//! CLI subcommand implementations.

pub mod once;
pub mod serve;
