//! Run summary: what was fetched, skipped, posted and failed.

use std::fmt;

use crate::format::{format_time, pluralize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    NoTicketKey,
    NoDescription,
    InvalidTicketKey,
    ZeroTime,
    UnknownAccount,
    LookupFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoTicketKey => "no issue key",
            SkipReason::NoDescription => "no description",
            SkipReason::InvalidTicketKey => "issue not found",
            SkipReason::ZeroTime => "no time spent",
            SkipReason::UnknownAccount => "unknown account",
            SkipReason::LookupFailed => "lookup failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub label: String,
    pub reason: SkipReason,
    /// Error text when the skip was caused by a failed service call.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedEntry {
    pub label: String,
    pub worklog_id: i64,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub fetched: usize,
    pub running_excluded: usize,
    pub merged_away: usize,
    pub prepared: usize,
    pub skipped: Vec<SkippedEntry>,
    pub posted: Vec<PostedEntry>,
    pub failed: Vec<FailedRecord>,
    pub rounding_delta_seconds: i64,
}

impl RunSummary {
    pub fn skip(&mut self, label: impl Into<String>, reason: SkipReason) {
        let label = label.into();
        log::warn!("Skipping {} - {}", label, reason);
        self.skipped.push(SkippedEntry {
            label,
            reason,
            detail: None,
        });
    }

    /// Records a skip caused by a failed service call, keeping the error text for the report.
    pub fn skip_with_detail(&mut self, label: impl Into<String>, reason: SkipReason, detail: impl Into<String>) {
        let label = label.into();
        let detail = detail.into();
        log::warn!("Skipping {} - {}: {}", label, reason, detail);
        self.skipped.push(SkippedEntry {
            label,
            reason,
            detail: Some(detail),
        });
    }

    pub fn posted_count(&self) -> usize {
        self.posted.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|entry| entry.reason == reason).count()
    }

    pub fn posted_seconds(&self) -> i64 {
        self.posted.iter().map(|entry| entry.seconds).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn log(&self) {
        log::info!(
            "Fetched {}, merged away {}",
            pluralize(self.fetched, "time entry", "time entries"),
            self.merged_away
        );
        if self.running_excluded > 0 {
            log::info!(
                "Excluded {} still running",
                pluralize(self.running_excluded, "time entry", "time entries")
            );
        }

        let reasons = [
            SkipReason::NoTicketKey,
            SkipReason::NoDescription,
            SkipReason::InvalidTicketKey,
            SkipReason::ZeroTime,
            SkipReason::UnknownAccount,
            SkipReason::LookupFailed,
        ];
        for reason in reasons {
            let count = self.skipped_count(reason);
            if count > 0 {
                log::warn!("Skipped {} ({})", pluralize(count, "entry", "entries"), reason);
            }
        }
        for entry in &self.skipped {
            if let Some(detail) = &entry.detail {
                log::warn!("  {}: {}", entry.label, detail);
            }
        }

        log::info!(
            "✓ Posted {} of {} ({})",
            self.posted_count(),
            pluralize(self.prepared, "worklog", "worklogs"),
            format_time(self.posted_seconds())
        );
        for failure in &self.failed {
            log::error!("✗ Failed to post {}: {}", failure.label, failure.reason);
        }

        if self.rounding_delta_seconds != 0 {
            let direction = if self.rounding_delta_seconds > 0 { "up" } else { "down" };
            log::info!(
                "Rounded {} by {} in total",
                direction,
                format_time(self.rounding_delta_seconds)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_skips_per_reason() {
        let mut summary = RunSummary::default();
        summary.skip("Lunch", SkipReason::NoTicketKey);
        summary.skip("Break", SkipReason::NoTicketKey);
        summary.skip("DEV-1: x", SkipReason::ZeroTime);

        assert_eq!(summary.skipped_count(SkipReason::NoTicketKey), 2);
        assert_eq!(summary.skipped_count(SkipReason::ZeroTime), 1);
        assert_eq!(summary.skipped_count(SkipReason::UnknownAccount), 0);
    }

    #[test]
    fn lookup_failures_keep_their_error_text() {
        let mut summary = RunSummary::default();
        summary.skip_with_detail("DEV-2: Deploy", SkipReason::LookupFailed, "request timed out: issue lookup");

        assert_eq!(summary.skipped_count(SkipReason::LookupFailed), 1);
        assert_eq!(
            summary.skipped[0].detail.as_deref(),
            Some("request timed out: issue lookup")
        );
        assert_eq!(SkipReason::LookupFailed.to_string(), "lookup failed");
    }

    #[test]
    fn posted_seconds_sums_posted_entries() {
        let summary = RunSummary {
            posted: vec![
                PostedEntry { label: "a".into(), worklog_id: 1, seconds: 900 },
                PostedEntry { label: "b".into(), worklog_id: 2, seconds: 1800 },
            ],
            ..RunSummary::default()
        };
        assert_eq!(summary.posted_seconds(), 2700);
        assert!(!summary.has_failures());
    }
}
