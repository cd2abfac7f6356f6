//! Core domain logic for the Toggl Track exporter.
//!
//! This crate contains the fundamental types and logic for:
//! - Entries: provider payloads and label rendering
//! - Windows: trailing lookback ranges and their query parameters
//! - Aggregation: grouping entries and deriving window statistics
//! - Running timer: projecting the current entry into a snapshot
//! - Workspace totals: project, client and tag counts

mod aggregation;
pub mod entry;
mod running;
pub mod window;
mod workspace;

pub use aggregation::{
    AggregateBucket, GroupKey, WindowAggregate, WindowStats, aggregate_window,
};
pub use entry::{Identity, NONE_LABEL, NameLookup, NamedEntity, TimeEntry};
pub use running::{RunningTimerLabels, RunningTimerSnapshot, project_running_timer};
pub use window::{LookbackWindow, TimeRange, WindowError};
pub use workspace::WorkspaceTotals;
