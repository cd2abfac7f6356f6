use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use te_api::Client;
use te_cli::commands::{once, serve};
use te_cli::{Cli, Collector, Commands, Config};
use te_metrics::Metrics;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries the `once` exposition, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let api_token = config
        .api_token()
        .context("missing Toggl API token (set TOGGL_API_TOKEN or config.toml)")?;
    let client = Client::with_options(
        api_token,
        config.api_base_url.as_str(),
        config.request_timeout(),
    )
    .context("failed to create Toggl API client")?;
    let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);
    let collector = Collector::new(
        client,
        Arc::clone(&metrics),
        config.lookback_hours.clone(),
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => runtime.block_on(serve::run(
            collector,
            metrics,
            config.listen_addr,
            config.scrape_interval(),
        )),
        Commands::Once => {
            let mut stdout = std::io::stdout().lock();
            runtime.block_on(once::run(&mut stdout, &collector))
        }
    }
}
