//! The sync run: fetch, merge, resolve, validate, round, attribute, estimate, then post.
//!
//! Every prompt happens before the first worklog is posted.

use chrono::{DateTime, Days, Local, NaiveDate};

use crate::accounts::{AccountAttributor, Attribution};
use crate::config::ConfigStore;
use crate::error::{Result, SyncError};
use crate::estimate::EstimateReconciler;
use crate::format::{format_time, pluralize};
use crate::issue_cache::IssueCache;
use crate::merge::merge_entries;
use crate::model::{MergedEntry, PreparedWorklog, RawTimeEntry};
use crate::posting::{summarize, PostingOrchestrator};
use crate::prompt::Terminal;
use crate::rounding::{RoundingConfig, RoundingEngine};
use crate::services::{IssueTracker, TimeTracker, WorklogService};
use crate::summary::{RunSummary, SkipReason};
use crate::ticket::{Resolution, TicketKey, TicketResolver};
use crate::timer::{guard_running_timer, TimerCheck};

pub struct SyncServices<'a> {
    pub time_tracker: &'a dyn TimeTracker,
    pub issues: &'a dyn IssueTracker,
    pub worklogs: &'a dyn WorklogService,
    pub terminal: &'a dyn Terminal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(RunSummary),
    /// Clean early exit; the message says why.
    NothingToDo(String),
}

struct Candidate {
    entry: MergedEntry,
    key: TicketKey,
    description: String,
}

pub async fn run_sync(
    services: &SyncServices<'_>,
    store: &mut ConfigStore,
    author_account_id: &str,
    date: NaiveDate,
    now: DateTime<Local>,
) -> Result<SyncOutcome> {
    let terminal = services.terminal;

    if date == now.date_naive() {
        let check = guard_running_timer(services.time_tracker, terminal, now).await?;
        if check == TimerCheck::Declined {
            return Ok(SyncOutcome::NothingToDo(
                "Timer left running, nothing synced".to_string(),
            ));
        }
    }

    let entries = fetch_entries(services.time_tracker, date).await?;
    let mut summary = RunSummary {
        fetched: entries.len(),
        ..RunSummary::default()
    };
    let (running, finished): (Vec<RawTimeEntry>, Vec<RawTimeEntry>) =
        entries.into_iter().partition(RawTimeEntry::is_running);
    summary.running_excluded = running.len();

    if finished.is_empty() {
        return Ok(SyncOutcome::NothingToDo(format!("No time entries to sync for {}", date)));
    }

    let merged = merge_entries(&finished);
    summary.merged_away = finished.len() - merged.len();
    log::info!(
        "Merged into {}",
        pluralize(merged.len(), "time entry", "time entries")
    );

    let settings = store.settings().clone();
    let pattern = settings.ticket_pattern()?;
    let resolver = TicketResolver::new(&pattern);

    let mut candidates = Vec::with_capacity(merged.len());
    for entry in merged {
        match resolver.resolve(&entry, terminal).await? {
            Resolution::Resolved { key, description } => candidates.push(Candidate {
                entry,
                key,
                description,
            }),
            Resolution::Skipped(reason) => summary.skip(entry.label(), reason),
        }
    }

    let cache = IssueCache::default();
    let lookup_failures = cache
        .validate_all(services.issues, candidates.iter().map(|candidate| &candidate.key))
        .await;

    let rounding = RoundingEngine::new(RoundingConfig::from_settings(&settings.rounding));
    let mut attributor = AccountAttributor::from_settings(&settings.accounts);
    let mut estimates = EstimateReconciler::new(settings.remaining_estimate);
    let mut prepared = Vec::with_capacity(candidates.len());

    for Candidate {
        entry,
        key,
        description,
    } in candidates
    {
        let label = format!("{}: {}", key, description);
        if let Some(err) = lookup_failures.get(&key) {
            summary.skip_with_detail(label, SkipReason::LookupFailed, err.to_string());
            continue;
        }
        let Some(ticket) = cache.cached(&key).flatten() else {
            summary.skip(label, SkipReason::InvalidTicketKey);
            continue;
        };

        let rounded = rounding.round(entry.duration_seconds, &key, terminal).await?;
        summary.rounding_delta_seconds += rounded.delta();
        let billable_seconds = rounded.final_seconds;
        if billable_seconds <= 0 {
            summary.skip(label, SkipReason::ZeroTime);
            continue;
        }

        let attributes = match attributor
            .attribute(key.project_key(), services.worklogs, store, terminal)
            .await?
        {
            Attribution::Inactive => Vec::new(),
            Attribution::Attached(attribute) => vec![attribute],
            Attribution::Skipped(reason) => {
                summary.skip(label, reason);
                continue;
            }
            Attribution::Unavailable(detail) => {
                summary.skip_with_detail(label, SkipReason::LookupFailed, detail);
                continue;
            }
        };

        let estimate = estimates
            .reconcile(&ticket, billable_seconds, terminal)
            .await?;

        prepared.push(PreparedWorklog {
            ticket,
            description,
            billable_seconds,
            start: entry.start,
            author_account_id: author_account_id.to_string(),
            remaining_estimate_seconds: estimate.map(|update| update.seconds),
            estimate_basis: estimate.map(|update| update.basis),
            attributes,
        });
    }

    summary.prepared = prepared.len();
    if prepared.is_empty() {
        log::warn!("Nothing to post");
        return Ok(SyncOutcome::Completed(summary));
    }

    log::info!(
        "Posting {} ({})",
        pluralize(prepared.len(), "worklog", "worklogs"),
        format_time(prepared.iter().map(|worklog| worklog.billable_seconds).sum())
    );
    let outcomes = PostingOrchestrator::new(settings.post_concurrency)
        .post_all(services.worklogs, prepared)
        .await;
    let (posted, failed) = summarize(&outcomes);
    summary.posted = posted;
    summary.failed = failed;

    Ok(SyncOutcome::Completed(summary))
}

async fn fetch_entries(tracker: &dyn TimeTracker, date: NaiveDate) -> Result<Vec<RawTimeEntry>> {
    let next_day = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| SyncError::InvalidDate(date.to_string()))?;
    let entries = tracker
        .fetch_entries(date, next_day)
        .await
        .map_err(|err| SyncError::api("Failed to fetch time entries", err))?;
    log::info!(
        "✓ Fetched {}",
        pluralize(entries.len(), "time entry", "time entries")
    );
    Ok(entries)
}
