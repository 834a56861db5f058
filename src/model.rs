//! Records that flow through a sync run, from fetched time entries to posted worklogs.

use chrono::{DateTime, Local};

use crate::ticket::TicketKey;

/// One tracked interval as fetched from the time tracker. A negative duration marks a running timer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTimeEntry {
    pub id: i64,
    pub workspace_id: Option<i64>,
    pub description: Option<String>,
    pub duration_seconds: i64,
    pub start: DateTime<Local>,
    pub stop: Option<DateTime<Local>>,
    pub project_id: Option<i64>,
}

impl RawTimeEntry {
    pub fn is_running(&self) -> bool {
        self.duration_seconds < 0
    }

    /// Description with surrounding whitespace removed; `None` when absent or blank.
    pub fn merge_key(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Aggregate of raw entries sharing a description. Fields other than the duration come from the first-seen entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntry {
    pub id: i64,
    pub description: Option<String>,
    pub duration_seconds: i64,
    pub start: DateTime<Local>,
    pub project_id: Option<i64>,
    pub source_ids: Vec<i64>,
}

impl MergedEntry {
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or("<no description>")
    }
}

/// A ticket key confirmed to exist in the issue tracker, with its numeric issue id and the
/// remaining estimate reported by the same lookup (`None` when the issue has no estimate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTicket {
    pub key: TicketKey,
    pub issue_id: String,
    pub remaining_estimate_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklogAttribute {
    pub key: String,
    pub value: String,
}

/// How an attached remaining estimate was derived. `before_seconds` is the estimate the value replaces,
/// assuming every earlier worklog on the same ticket was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateBasis {
    /// `before_seconds` minus the billable time, clamped at zero.
    Subtracted { before_seconds: i64 },
    /// A value chosen by the user.
    Fixed { before_seconds: i64 },
}

impl EstimateBasis {
    pub fn before_seconds(&self) -> i64 {
        match self {
            EstimateBasis::Subtracted { before_seconds } | EstimateBasis::Fixed { before_seconds } => {
                *before_seconds
            }
        }
    }
}

/// Final payload for one worklog; consumed exactly once by the posting step.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedWorklog {
    pub ticket: ResolvedTicket,
    pub description: String,
    pub billable_seconds: i64,
    pub start: DateTime<Local>,
    pub author_account_id: String,
    pub remaining_estimate_seconds: Option<i64>,
    pub estimate_basis: Option<EstimateBasis>,
    pub attributes: Vec<WorklogAttribute>,
}

impl PreparedWorklog {
    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn start_time(&self) -> String {
        self.start.format("%H:%M:%S").to_string()
    }

    pub fn nicename(&self) -> String {
        format!("{}: {}", self.ticket.key, self.description)
    }
}

/// Response of a worklog POST; a missing id means the post did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedWorklog {
    pub id: Option<i64>,
}

/// A worklog already stored in the worklog service, as listed by `show` and `delete`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedWorklog {
    pub id: i64,
    pub issue_id: Option<String>,
    pub seconds: i64,
    pub description: Option<String>,
}
