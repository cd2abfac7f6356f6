//! Single scrape cycle printed as a Prometheus exposition.

use std::io::Write;

use anyhow::{Context, Result, bail};
use te_api::TogglApi;

use crate::collector::{Collector, CycleOutcome};

pub async fn run<W: Write, A: TogglApi>(writer: &mut W, collector: &Collector<A>) -> Result<()> {
    if collector.run_one_cycle().await == CycleOutcome::IdentityUnavailable {
        bail!("failed to resolve Toggl identity from /me");
    }

    let exposition = collector
        .metrics()
        .encode()
        .context("failed to encode metrics")?;
    writer.write_all(exposition.as_bytes())?;
    Ok(())
}
