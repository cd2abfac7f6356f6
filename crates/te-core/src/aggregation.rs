//! Time-entry aggregation.
//!
//! Reduces the raw entries of one lookback window into per-group duration and
//! count buckets, plus window-level statistics that are not present in the raw
//! data.
//!
//! # Algorithm Summary
//!
//! 1. Skip entries whose duration is not positive (running or degenerate)
//! 2. Compute each entry's [`GroupKey`], backfilling names from lookups
//! 3. Add duration and count into that key's bucket
//! 4. Accumulate window statistics in the same pass
//!
//! Buckets live in a `BTreeMap`, so output is identical for identical input
//! regardless of entry order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::entry::{NameLookup, TimeEntry, join_tags, render_billable, render_optional};
use crate::window::LookbackWindow;

/// Composite dimension tuple identifying one aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub workspace_id: i64,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub task_id: Option<i64>,
    pub task_name: Option<String>,
    /// Sorted, comma-joined tags. Empty for untagged entries.
    pub tags: String,
    pub billable: bool,
}

impl GroupKey {
    /// Builds the key for an entry.
    ///
    /// A name missing from the entry is looked up by id. Without an id there
    /// is no name either.
    pub fn for_entry(entry: &TimeEntry, projects: &NameLookup, tasks: &NameLookup) -> Self {
        let project_name = entry.project_id.and_then(|id| {
            entry
                .project_name
                .clone()
                .or_else(|| projects.get(id).map(str::to_string))
        });
        let task_name = entry.task_id.and_then(|id| {
            entry
                .task_name
                .clone()
                .or_else(|| tasks.get(id).map(str::to_string))
        });

        Self {
            workspace_id: entry.workspace_id,
            project_id: entry.project_id,
            project_name,
            task_id: entry.task_id,
            task_name,
            tags: join_tags(&entry.tags),
            billable: entry.billable,
        }
    }

    /// Label values in the order
    /// `workspace_id, project_id, project_name, task_id, task_name, tags, billable`.
    pub fn label_values(&self) -> [String; 7] {
        [
            self.workspace_id.to_string(),
            render_optional(self.project_id),
            render_optional(self.project_name.as_deref()),
            render_optional(self.task_id),
            render_optional(self.task_name.as_deref()),
            self.tags.clone(),
            render_billable(self.billable).to_string(),
        ]
    }
}

/// Running sums for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateBucket {
    /// Sum of durations in seconds.
    pub total_duration: i64,
    pub total_count: u64,
}

/// Statistics derived across all groups of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    /// Mean duration in seconds, 0 when there are no entries.
    pub avg_duration: f64,
    /// Billable share of total duration in \[0.0, 1.0\], 0 when nothing was tracked.
    pub billable_ratio: f64,
    /// Distinct UTC calendar dates among entry start times. Entries without a
    /// start contribute to every other statistic but not to this one.
    pub distinct_days: usize,
    pub untagged_duration: i64,
    pub untagged_count: u64,
}

/// Result of aggregating one window for one workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregate {
    pub workspace_id: i64,
    pub window: LookbackWindow,
    pub buckets: BTreeMap<GroupKey, AggregateBucket>,
    pub stats: WindowStats,
}

#[derive(Debug, Default)]
struct Totals {
    duration: i64,
    count: u64,
    billable_duration: i64,
    untagged_duration: i64,
    untagged_count: u64,
    days: BTreeSet<NaiveDate>,
}

impl Totals {
    fn add(&mut self, entry: &TimeEntry) {
        self.duration += entry.duration;
        self.count += 1;
        if entry.billable {
            self.billable_duration += entry.duration;
        }
        if entry.tags.is_empty() {
            self.untagged_duration += entry.duration;
            self.untagged_count += 1;
        }
        if let Some(start) = entry.start {
            self.days.insert(start.date_naive());
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn into_stats(self) -> WindowStats {
        let avg_duration = if self.count > 0 {
            self.duration as f64 / self.count as f64
        } else {
            0.0
        };
        let billable_ratio = if self.duration > 0 {
            (self.billable_duration as f64 / self.duration as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };

        WindowStats {
            avg_duration,
            billable_ratio,
            distinct_days: self.days.len(),
            untagged_duration: self.untagged_duration,
            untagged_count: self.untagged_count,
        }
    }
}

/// Aggregates the entries of one window.
///
/// # Arguments
///
/// * `workspace_id` - Workspace the window statistics are reported under
/// * `window` - The lookback window the entries were fetched for
/// * `entries` - Raw entries; running and zero-length entries are ignored
/// * `projects` / `tasks` - Lookups used to fill names missing from entries
pub fn aggregate_window(
    workspace_id: i64,
    window: LookbackWindow,
    entries: &[TimeEntry],
    projects: &NameLookup,
    tasks: &NameLookup,
) -> WindowAggregate {
    let mut buckets: BTreeMap<GroupKey, AggregateBucket> = BTreeMap::new();
    let mut totals = Totals::default();

    for entry in entries.iter().filter(|entry| entry.is_completed()) {
        let bucket = buckets
            .entry(GroupKey::for_entry(entry, projects, tasks))
            .or_default();
        bucket.total_duration += entry.duration;
        bucket.total_count += 1;
        totals.add(entry);
    }

    tracing::debug!(
        workspace_id,
        %window,
        entries = entries.len(),
        completed = totals.count,
        groups = buckets.len(),
        "aggregated time entries"
    );

    WindowAggregate {
        workspace_id,
        window,
        buckets,
        stats: totals.into_stats(),
    }
}
