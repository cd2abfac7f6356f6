//! Workspace-wide object counts.

use crate::entry::NamedEntity;

/// Project, client and tag counts for one workspace.
///
/// A failed fetch counts as zero so that every cycle resets the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkspaceTotals {
    pub workspace_id: i64,
    pub projects: usize,
    pub clients: usize,
    pub tags: usize,
}

impl WorkspaceTotals {
    pub fn from_fetches(
        workspace_id: i64,
        projects: Option<&[NamedEntity]>,
        clients: Option<&[NamedEntity]>,
        tags: Option<&[NamedEntity]>,
    ) -> Self {
        Self {
            workspace_id,
            projects: projects.map_or(0, <[NamedEntity]>::len),
            clients: clients.map_or(0, <[NamedEntity]>::len),
            tags: tags.map_or(0, <[NamedEntity]>::len),
        }
    }
}
