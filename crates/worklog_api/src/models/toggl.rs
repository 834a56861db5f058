//! Toggl Track time entry payloads.

use serde::Deserialize;

/// A tracked interval as returned by `me/time_entries`; a negative duration marks a running timer.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: i64,
    pub workspace_id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    pub duration: i64,
    pub start: String,
    #[serde(default)]
    pub stop: Option<String>,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.duration < 0
    }
}
