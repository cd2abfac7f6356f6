//! Running-timer projection.

use crate::entry::{TimeEntry, join_tags, render_billable, render_optional};

/// Labels describing the currently running entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTimerLabels {
    pub workspace_id: i64,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub task_id: Option<i64>,
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub tags: String,
    pub billable: bool,
}

impl RunningTimerLabels {
    /// Label values in the order
    /// `workspace_id, project_id, project_name, task_id, task_name, description, tags, billable`.
    pub fn label_values(&self) -> [String; 8] {
        [
            self.workspace_id.to_string(),
            render_optional(self.project_id),
            render_optional(self.project_name.as_deref()),
            render_optional(self.task_id),
            render_optional(self.task_name.as_deref()),
            self.description.clone().unwrap_or_default(),
            self.tags.clone(),
            render_billable(self.billable).to_string(),
        ]
    }
}

/// One scrape's view of the running timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTimerSnapshot {
    pub labels: RunningTimerLabels,
    /// Start instant in Unix seconds, when the provider reported one.
    pub start_timestamp: Option<i64>,
}

impl RunningTimerSnapshot {
    pub fn from_entry(entry: &TimeEntry) -> Self {
        Self {
            labels: RunningTimerLabels {
                workspace_id: entry.workspace_id,
                project_id: entry.project_id,
                project_name: entry.project_id.and(entry.project_name.clone()),
                task_id: entry.task_id,
                task_name: entry.task_id.and(entry.task_name.clone()),
                description: entry.description.clone(),
                tags: join_tags(&entry.tags),
                billable: entry.billable,
            },
            start_timestamp: entry.start.map(|start| start.timestamp()),
        }
    }
}

/// Projects the current entry, if any, into a snapshot.
///
/// `None` yields no snapshot. Series from earlier scrapes stay in the registry
/// until the scraping Prometheus server marks them stale.
pub fn project_running_timer(current: Option<&TimeEntry>) -> Option<RunningTimerSnapshot> {
    current.map(RunningTimerSnapshot::from_entry)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn running_entry() -> TimeEntry {
        TimeEntry {
            id: 999,
            workspace_id: 123_456,
            project_id: Some(987_654),
            project_name: Some("Test Project".to_string()),
            task_id: Some(112_233),
            task_name: Some("Test Task".to_string()),
            description: Some("Testing running timer".to_string()),
            tags: vec!["test-tag".to_string(), "billing".to_string()],
            billable: true,
            duration: -1234,
            start: Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 50, 0).unwrap()),
            stop: None,
        }
    }

    #[test]
    fn test_projects_running_entry() {
        let entry = running_entry();
        let snapshot = project_running_timer(Some(&entry)).unwrap();

        assert_eq!(snapshot.start_timestamp, Some(1_741_600_200));
        assert_eq!(
            snapshot.labels.label_values(),
            [
                "123456",
                "987654",
                "Test Project",
                "112233",
                "Test Task",
                "Testing running timer",
                "billing,test-tag",
                "True",
            ]
            .map(String::from)
        );
    }

    #[test]
    fn test_no_entry_projects_nothing() {
        assert_eq!(project_running_timer(None), None);
    }

    #[test]
    fn test_missing_fields_render_sentinels() {
        let entry = TimeEntry {
            project_id: None,
            project_name: Some("ignored".to_string()),
            task_id: None,
            task_name: None,
            description: None,
            tags: Vec::new(),
            billable: false,
            ..running_entry()
        };
        let snapshot = RunningTimerSnapshot::from_entry(&entry);

        assert_eq!(
            snapshot.labels.label_values(),
            ["123456", "none", "none", "none", "none", "", "", "False"].map(String::from)
        );
    }

    #[test]
    fn test_missing_start_has_no_timestamp() {
        let entry = TimeEntry {
            start: None,
            ..running_entry()
        };
        let snapshot = RunningTimerSnapshot::from_entry(&entry);

        assert_eq!(snapshot.start_timestamp, None);
        assert_eq!(snapshot.labels.workspace_id, 123_456);
    }
}
