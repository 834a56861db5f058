//! `show` and `delete`: list the author's worklogs for a day and optionally delete them all.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::error::{Result, SyncError};
use crate::format::{format_time, pluralize};
use crate::issue_cache::IssueCache;
use crate::model::LoggedWorklog;
use crate::prompt::{confirm, Terminal};
use crate::services::{IssueTracker, WorklogService};
use crate::summary::FailedRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ListedWorklog {
    pub worklog: LoggedWorklog,
    pub key: Option<String>,
}

impl ListedWorklog {
    pub fn ticket_label(&self) -> String {
        match (&self.key, &self.worklog.issue_id) {
            (Some(key), _) => key.clone(),
            (None, Some(id)) => format!("ID:{}", id),
            (None, None) => "ID:?".to_string(),
        }
    }

    pub fn nicename(&self) -> String {
        format!(
            "{}: {}",
            self.ticket_label(),
            self.worklog.description.as_deref().unwrap_or("")
        )
    }
}

/// Worklogs of `author` on `date`, each with its issue key resolved once per distinct issue id.
pub async fn fetch_listing(
    worklogs: &dyn WorklogService,
    issues: &dyn IssueTracker,
    author_account_id: &str,
    date: NaiveDate,
) -> Result<Vec<ListedWorklog>> {
    let logged = worklogs
        .list_worklogs(author_account_id, date)
        .await
        .map_err(|err| SyncError::api("Failed to fetch worklogs", err))?;

    let cache = IssueCache::default();
    let cache = &cache;
    let issue_ids: BTreeSet<&str> = logged
        .iter()
        .filter_map(|worklog| worklog.issue_id.as_deref())
        .collect();
    let keys: HashMap<&str, Option<String>> =
        join_all(issue_ids.into_iter().map(|issue_id| async move {
            let key = match cache.key_for_id(issues, issue_id).await {
                Ok(key) => key,
                Err(err) => {
                    log::warn!("Could not resolve issue {}: {}", issue_id, err);
                    None
                }
            };
            (issue_id, key)
        }))
        .await
        .into_iter()
        .collect();

    let listed: Vec<ListedWorklog> = logged
        .iter()
        .map(|worklog| ListedWorklog {
            worklog: worklog.clone(),
            key: worklog
                .issue_id
                .as_deref()
                .and_then(|issue_id| keys.get(issue_id).cloned().flatten()),
        })
        .collect();
    Ok(listed)
}

pub fn render_line(index: usize, item: &ListedWorklog) -> String {
    format!(
        "{:02} - {} ({})",
        index + 1,
        item.nicename(),
        format_time(item.worklog.seconds)
    )
}

pub fn total_seconds(items: &[ListedWorklog]) -> i64 {
    items.iter().map(|item| item.worklog.seconds).sum()
}

pub fn print_listing(items: &[ListedWorklog]) {
    for (index, item) in items.iter().enumerate() {
        println!("{}", render_line(index, item));
    }
    println!("Total time logged: {}", format_time(total_seconds(items)));
}

pub async fn show(
    worklogs: &dyn WorklogService,
    issues: &dyn IssueTracker,
    author_account_id: &str,
    date: NaiveDate,
) -> Result<Vec<ListedWorklog>> {
    let items = fetch_listing(worklogs, issues, author_account_id, date).await?;
    if items.is_empty() {
        log::info!("No worklogs found for {}", date);
    } else {
        print_listing(&items);
    }
    Ok(items)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteReport {
    pub deleted: Vec<i64>,
    pub failed: Vec<FailedRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    NothingToDo,
    Cancelled,
    Done(DeleteReport),
}

/// Deletes every listed worklog; a failure is recorded and the rest continue.
pub async fn delete_all(
    service: &dyn WorklogService,
    items: &[ListedWorklog],
    concurrency: usize,
) -> DeleteReport {
    let results: Vec<_> = stream::iter(items)
        .map(|item| async move { (item, service.delete_worklog(item.worklog.id).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = DeleteReport::default();
    for (item, result) in results {
        match result {
            Ok(true) => report.deleted.push(item.worklog.id),
            Ok(false) => report.failed.push(FailedRecord {
                label: item.nicename(),
                reason: "deletion was rejected".to_string(),
            }),
            Err(err) => report.failed.push(FailedRecord {
                label: item.nicename(),
                reason: err.to_string(),
            }),
        }
    }
    report
}

pub async fn delete<T>(
    worklogs: &dyn WorklogService,
    issues: &dyn IssueTracker,
    terminal: &T,
    author_account_id: &str,
    date: NaiveDate,
    concurrency: usize,
) -> Result<DeleteOutcome>
where
    T: Terminal + ?Sized,
{
    let items = show(worklogs, issues, author_account_id, date).await?;
    if items.is_empty() {
        return Ok(DeleteOutcome::NothingToDo);
    }
    if !confirm(terminal, "Are you sure you want to delete these worklogs? (y/n) ").await? {
        log::info!("Deletion cancelled");
        return Ok(DeleteOutcome::Cancelled);
    }

    let report = delete_all(worklogs, &items, concurrency).await;
    log::info!(
        "✓ Deleted {}",
        pluralize(report.deleted.len(), "worklog", "worklogs")
    );
    for failure in &report.failed {
        log::error!("✗ Failed to delete {}: {}", failure.label, failure.reason);
    }
    Ok(DeleteOutcome::Done(report))
}
