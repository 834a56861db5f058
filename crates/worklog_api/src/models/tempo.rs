//! Tempo worklog and account payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST worklogs`.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorklogCreate {
    pub issue_id: i64,
    pub author_account_id: String,
    pub time_spent_seconds: i64,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `HH:MM:SS`
    pub start_time: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_estimate_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<WorkAttributeValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkAttributeValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Worklog {
    #[serde(default)]
    pub tempo_worklog_id: Option<i64>,
    #[serde(default)]
    pub issue: Option<WorklogIssue>,
    #[serde(default)]
    pub time_spent_seconds: i64,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorklogIssue {
    pub id: Value,
}

impl WorklogIssue {
    /// Tempo serializes the Jira issue id as a number; older payloads used strings.
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Value::Number(number) => Some(number.to_string()),
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageMetadata {
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Account {
    pub key: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
