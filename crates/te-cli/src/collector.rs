//! One scrape cycle against the Toggl API.
//!
//! A cycle resolves the caller's identity, publishes the running timer,
//! counts workspace objects and aggregates each lookback window. Cycles keep
//! no state between runs apart from the metric sink.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use te_api::{Fetcher, TogglApi};
use te_core::{
    LookbackWindow, NameLookup, WorkspaceTotals, aggregate_window, project_running_timer,
};
use te_metrics::Metrics;

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// `/me` failed; nothing was published.
    IdentityUnavailable,
    /// The caller has no default workspace; workspace series were cleared.
    NoWorkspace,
    /// All steps ran. `windows` counts windows whose entries were fetched.
    Completed { workspace_id: i64, windows: usize },
}

/// Runs scrape cycles against one API and one metric sink.
#[derive(Debug)]
pub struct Collector<A> {
    api: A,
    metrics: Arc<Metrics>,
    windows: Vec<LookbackWindow>,
}

impl<A: TogglApi> Collector<A> {
    pub const fn new(api: A, metrics: Arc<Metrics>, windows: Vec<LookbackWindow>) -> Self {
        Self {
            api,
            metrics,
            windows,
        }
    }

    /// The sink every cycle writes to.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Runs one full cycle and records its duration.
    ///
    /// An unresolved identity is logged and leaves the duration untouched;
    /// the next cycle retries.
    pub async fn run_one_cycle(&self) -> CycleOutcome {
        let started = Instant::now();
        let outcome = self.run_cycle_at(Utc::now()).await;

        match outcome {
            CycleOutcome::IdentityUnavailable => {
                tracing::error!(
                    "could not resolve Toggl identity; check the API token and connectivity"
                );
                return outcome;
            }
            CycleOutcome::NoWorkspace => {}
            CycleOutcome::Completed {
                workspace_id,
                windows,
            } => {
                tracing::info!(workspace_id, windows, "scrape cycle complete");
            }
        }

        let elapsed = started.elapsed();
        self.metrics.record_scrape_duration(elapsed);
        tracing::debug!(elapsed_ms = elapsed.as_millis(), "recorded scrape duration");
        outcome
    }

    /// Runs the cycle steps with `now` as the end of every window.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        let fetcher = Fetcher::new(&self.api, &self.metrics);

        let Some(identity) = fetcher.me().await else {
            return CycleOutcome::IdentityUnavailable;
        };

        let current = fetcher.current_time_entry().await;
        if let Some(snapshot) = project_running_timer(current.as_ref()) {
            self.metrics.record_running_timer(&snapshot);
        }

        let Some(workspace_id) = identity.default_workspace_id else {
            tracing::warn!(
                user_id = identity.id,
                "no default workspace; clearing workspace metrics"
            );
            self.metrics.clear_workspace_series();
            return CycleOutcome::NoWorkspace;
        };

        let projects = fetcher.projects(workspace_id).await;
        let clients = fetcher.clients(workspace_id).await;
        let tags = fetcher.tags(workspace_id).await;
        self.metrics
            .record_workspace_totals(&WorkspaceTotals::from_fetches(
                workspace_id,
                projects.as_deref(),
                clients.as_deref(),
                tags.as_deref(),
            ));

        let project_names = projects
            .as_deref()
            .map(NameLookup::from_entities)
            .unwrap_or_default();
        let task_names = fetcher
            .tasks(workspace_id)
            .await
            .as_deref()
            .map(NameLookup::from_entities)
            .unwrap_or_default();
        if project_names.is_empty() && task_names.is_empty() {
            tracing::debug!("no name lookups; using names carried by entries");
        } else {
            tracing::debug!(
                projects = project_names.len(),
                tasks = task_names.len(),
                "built name lookups"
            );
        }

        let mut windows = 0;
        for window in &self.windows {
            let range = window.range_ending(now);
            // A failed fetch leaves this window's previous series in place.
            let Some(entries) = fetcher.time_entries(&range).await else {
                tracing::warn!(%window, "time entries unavailable; keeping previous values");
                continue;
            };
            let aggregate =
                aggregate_window(workspace_id, *window, &entries, &project_names, &task_names);
            self.metrics.record_window(&aggregate);
            windows += 1;
        }

        CycleOutcome::Completed {
            workspace_id,
            windows,
        }
    }
}
