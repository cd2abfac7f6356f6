//! Provider payloads and label rendering.
//!
//! Ids and names stay `Option` throughout the crate. They become the `"none"`
//! sentinel only when rendered into label values.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Label value rendered for an absent id or name.
pub const NONE_LABEL: &str = "none";

/// A time entry as returned by the provider.
///
/// Running entries carry a negative `duration` and no `stop`. Entries that
/// never ran may also lack a `start`; aggregation skips them anyway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub workspace_id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// The provider sends `null` for entries that were never tagged.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub billable: bool,
    /// Duration in seconds.
    pub duration: i64,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// Whether the entry has finished with a positive duration.
    ///
    /// Only these entries take part in aggregation.
    pub const fn is_completed(&self) -> bool {
        self.duration > 0
    }

    /// Tags sorted and comma-joined.
    pub fn tags_label(&self) -> String {
        join_tags(&self.tags)
    }
}

/// The caller's identity from `/me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub default_workspace_id: Option<i64>,
}

/// Any `{id, name}` shaped workspace object (project, client, tag, task).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Id to name lookup used to backfill names missing from entries.
#[derive(Debug, Clone, Default)]
pub struct NameLookup {
    names: HashMap<i64, String>,
}

impl NameLookup {
    pub fn from_entities(entities: &[NamedEntity]) -> Self {
        let names = entities
            .iter()
            .map(|entity| (entity.id, entity.name.clone()))
            .collect();
        Self { names }
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Renders tags in lexicographic order joined with commas.
///
/// An empty tag list renders as the empty string.
pub fn join_tags(tags: &[String]) -> String {
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// Renders an optional value, falling back to [`NONE_LABEL`].
pub fn render_optional<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| NONE_LABEL.to_string(), |v| v.to_string())
}

/// Renders a billable flag the way existing dashboards expect it.
pub const fn render_billable(billable: bool) -> &'static str {
    if billable { "True" } else { "False" }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
