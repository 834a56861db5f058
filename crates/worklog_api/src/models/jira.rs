//! Jira issue payloads, reduced to the fields the sync needs.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Issue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssueFields {
    #[serde(default)]
    pub timetracking: Option<TimeTracking>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimeTracking {
    #[serde(default)]
    pub original_estimate_seconds: Option<i64>,
    #[serde(default)]
    pub remaining_estimate_seconds: Option<i64>,
    #[serde(default)]
    pub time_spent_seconds: Option<i64>,
}

impl Issue {
    pub fn remaining_estimate_seconds(&self) -> Option<i64> {
        self.fields
            .timetracking
            .as_ref()
            .and_then(|tracking| tracking.remaining_estimate_seconds)
    }
}
