//! Metric sink for the Toggl Track exporter.
//!
//! Owns a Prometheus [`Registry`] and every series the exporter publishes.
//! Core results ([`WindowAggregate`], [`RunningTimerSnapshot`],
//! [`WorkspaceTotals`]) are written through the `record_*` methods.
//!
//! # Thread Safety
//!
//! The [`Metrics`] type is `Send + Sync`. Prometheus vectors synchronize
//! internally, so one instance can be shared behind an `Arc` between the
//! scrape loop (writer) and the HTTP handler (reader). Writes to the same
//! label set are last-writer-wins.
//!
//! # Staleness
//!
//! Series are only removed by [`Metrics::clear_workspace_series`]. A failed
//! time-entry fetch or a stopped timer leaves the previous values in place;
//! the scraping Prometheus server marks them stale once the exporter stops
//! updating them.

use std::time::Duration;

use prometheus::{Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

use te_core::{RunningTimerSnapshot, WindowAggregate, WorkspaceTotals};

/// Labels of the per-group time-entry series.
const GROUP_LABELS: [&str; 8] = [
    "workspace_id",
    "project_id",
    "project_name",
    "task_id",
    "task_name",
    "tags",
    "billable",
    "timeframe",
];

/// Labels of the running-timer series.
const RUNNING_LABELS: [&str; 8] = [
    "workspace_id",
    "project_id",
    "project_name",
    "task_id",
    "task_name",
    "description",
    "tags",
    "billable",
];

/// Content type of [`Metrics::encode`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

const WINDOW_LABELS: [&str; 2] = ["workspace_id", "timeframe"];
const WORKSPACE_LABELS: [&str; 1] = ["workspace_id"];

/// Metric sink errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering or encoding a series failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// All series published by the exporter.
pub struct Metrics {
    registry: Registry,
    pub api_errors: IntCounterVec,
    pub scrape_duration: Gauge,
    pub time_entry_running: GaugeVec,
    pub time_entry_start_timestamp: GaugeVec,
    pub projects_total: GaugeVec,
    pub clients_total: GaugeVec,
    pub tags_total: GaugeVec,
    pub time_entries_duration: GaugeVec,
    pub time_entries_count: GaugeVec,
    pub avg_duration: GaugeVec,
    pub billable_ratio: GaugeVec,
    pub distinct_days: GaugeVec,
    pub untagged_duration: GaugeVec,
    pub untagged_count: GaugeVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a fresh registry with every series registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let api_errors = IntCounterVec::new(
            Opts::new("toggl_api_errors_total", "Toggl API request errors"),
            &["endpoint"],
        )?;
        let scrape_duration = Gauge::new(
            "toggl_scrape_duration_seconds",
            "Duration of the last Toggl scrape cycle",
        )?;
        let time_entry_running = gauge_vec(
            "toggl_time_entry_running",
            "Whether a time entry is currently running (1 if running)",
            &RUNNING_LABELS,
        )?;
        let time_entry_start_timestamp = gauge_vec(
            "toggl_time_entry_start_timestamp_seconds",
            "Start time of the running time entry as a Unix timestamp",
            &RUNNING_LABELS,
        )?;
        let projects_total = gauge_vec(
            "toggl_projects_total",
            "Number of projects in the workspace",
            &WORKSPACE_LABELS,
        )?;
        let clients_total = gauge_vec(
            "toggl_clients_total",
            "Number of clients in the workspace",
            &WORKSPACE_LABELS,
        )?;
        let tags_total = gauge_vec(
            "toggl_tags_total",
            "Number of tags in the workspace",
            &WORKSPACE_LABELS,
        )?;
        let time_entries_duration = gauge_vec(
            "toggl_time_entries_duration_seconds",
            "Total duration of completed time entries in the lookback window",
            &GROUP_LABELS,
        )?;
        let time_entries_count = gauge_vec(
            "toggl_time_entries_count",
            "Number of completed time entries in the lookback window",
            &GROUP_LABELS,
        )?;
        let avg_duration = gauge_vec(
            "toggl_time_entries_avg_duration_seconds",
            "Average duration of completed time entries in the lookback window",
            &WINDOW_LABELS,
        )?;
        let billable_ratio = gauge_vec(
            "toggl_time_entries_billable_ratio",
            "Billable share of tracked time in the lookback window",
            &WINDOW_LABELS,
        )?;
        let distinct_days = gauge_vec(
            "toggl_days_with_time_entries_count",
            "Distinct days with time entries in the lookback window",
            &WINDOW_LABELS,
        )?;
        let untagged_duration = gauge_vec(
            "toggl_time_entries_untagged_duration_seconds",
            "Total duration of untagged time entries in the lookback window",
            &WINDOW_LABELS,
        )?;
        let untagged_count = gauge_vec(
            "toggl_time_entries_untagged_count",
            "Number of untagged time entries in the lookback window",
            &WINDOW_LABELS,
        )?;

        registry.register(Box::new(api_errors.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;
        for vec in [
            &time_entry_running,
            &time_entry_start_timestamp,
            &projects_total,
            &clients_total,
            &tags_total,
            &time_entries_duration,
            &time_entries_count,
            &avg_duration,
            &billable_ratio,
            &distinct_days,
            &untagged_duration,
            &untagged_count,
        ] {
            registry.register(Box::new(vec.clone()))?;
        }

        Ok(Self {
            registry,
            api_errors,
            scrape_duration,
            time_entry_running,
            time_entry_start_timestamp,
            projects_total,
            clients_total,
            tags_total,
            time_entries_duration,
            time_entries_count,
            avg_duration,
            billable_ratio,
            distinct_days,
            untagged_duration,
            untagged_count,
        })
    }

    /// Counts one failed API request against its endpoint.
    pub fn record_api_error(&self, endpoint: &str) {
        self.api_errors.with_label_values(&[endpoint]).inc();
    }

    pub fn record_scrape_duration(&self, elapsed: Duration) {
        self.scrape_duration.set(elapsed.as_secs_f64());
    }

    /// Publishes the running timer. Older label sets are not touched.
    ///
    /// The start timestamp series is skipped when the entry had no start.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_running_timer(&self, snapshot: &RunningTimerSnapshot) {
        let values = snapshot.labels.label_values();
        let labels = as_strs(&values);
        self.time_entry_running.with_label_values(&labels).set(1.0);
        if let Some(start) = snapshot.start_timestamp {
            self.time_entry_start_timestamp
                .with_label_values(&labels)
                .set(start as f64);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_workspace_totals(&self, totals: &WorkspaceTotals) {
        let workspace = totals.workspace_id.to_string();
        let labels = [workspace.as_str()];
        self.projects_total
            .with_label_values(&labels)
            .set(totals.projects as f64);
        self.clients_total
            .with_label_values(&labels)
            .set(totals.clients as f64);
        self.tags_total
            .with_label_values(&labels)
            .set(totals.tags as f64);
    }

    /// Publishes one window's buckets and statistics.
    ///
    /// Bucket series are overwritten per label set; groups that disappeared
    /// from the window keep their last value until cleared.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_window(&self, aggregate: &WindowAggregate) {
        let timeframe = aggregate.window.label();

        for (key, bucket) in &aggregate.buckets {
            let values = key.label_values();
            let mut labels = as_strs(&values).to_vec();
            labels.push(timeframe.as_str());
            self.time_entries_duration
                .with_label_values(&labels)
                .set(bucket.total_duration as f64);
            self.time_entries_count
                .with_label_values(&labels)
                .set(bucket.total_count as f64);
        }

        let workspace = aggregate.workspace_id.to_string();
        let labels = [workspace.as_str(), timeframe.as_str()];
        let stats = &aggregate.stats;
        self.avg_duration
            .with_label_values(&labels)
            .set(stats.avg_duration);
        self.billable_ratio
            .with_label_values(&labels)
            .set(stats.billable_ratio);
        self.distinct_days
            .with_label_values(&labels)
            .set(stats.distinct_days as f64);
        self.untagged_duration
            .with_label_values(&labels)
            .set(stats.untagged_duration as f64);
        self.untagged_count
            .with_label_values(&labels)
            .set(stats.untagged_count as f64);

        tracing::debug!(
            workspace_id = aggregate.workspace_id,
            %timeframe,
            groups = aggregate.buckets.len(),
            "published window metrics"
        );
    }

    /// Drops every workspace-scoped series across all windows.
    pub fn clear_workspace_series(&self) {
        for vec in [
            &self.projects_total,
            &self.clients_total,
            &self.tags_total,
            &self.time_entries_duration,
            &self.time_entries_count,
            &self.avg_duration,
            &self.billable_ratio,
            &self.distinct_days,
            &self.untagged_duration,
            &self.untagged_count,
        ] {
            vec.reset();
        }
    }

    /// Number of label sets currently held by the named series.
    pub fn series_count(&self, name: &str) -> usize {
        self.registry
            .gather()
            .iter()
            .find(|family| family.get_name() == name)
            .map_or(0, |family| family.get_metric().len())
    }

    /// Renders the Prometheus text exposition.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buffer = String::new();
        TextEncoder::new().encode_utf8(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

fn gauge_vec(name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec, MetricsError> {
    Ok(GaugeVec::new(Opts::new(name, help), labels)?)
}

fn as_strs<const N: usize>(values: &[String; N]) -> [&str; N] {
    std::array::from_fn(|i| values[i].as_str())
}
