//! Collaborator seams used by the sync core, with adapters for the Toggl, Jira and Tempo clients.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use worklog_api::{
    ApiError, JiraClient, TempoClient, TimeEntry, TogglClient, WorkAttributeValue, Worklog,
    WorklogCreate,
};

use crate::model::{LoggedWorklog, PostedWorklog, PreparedWorklog, RawTimeEntry, ResolvedTicket};
use crate::ticket::TicketKey;

pub type ServiceResult<T> = std::result::Result<T, ApiError>;

/// Source of raw time entries and the running timer.
#[async_trait]
pub trait TimeTracker: Send + Sync {
    /// Entries starting on or after `from` and before `to`.
    async fn fetch_entries(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<Vec<RawTimeEntry>>;
    async fn fetch_running_timer(&self) -> ServiceResult<Option<RawTimeEntry>>;
    async fn stop_timer(&self, workspace_id: i64, entry_id: i64) -> ServiceResult<bool>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// `None` when the issue does not exist.
    async fn find_issue(&self, key: &TicketKey) -> ServiceResult<Option<ResolvedTicket>>;

    async fn ticket_exists(&self, key: &TicketKey) -> ServiceResult<bool> {
        Ok(self.find_issue(key).await?.is_some())
    }

    async fn resolve_ticket_id(&self, key: &TicketKey) -> ServiceResult<Option<String>> {
        Ok(self.find_issue(key).await?.map(|ticket| ticket.issue_id))
    }

    async fn resolve_ticket_key(&self, issue_id: &str) -> ServiceResult<Option<String>>;

    async fn fetch_remaining_estimate(&self, key: &TicketKey) -> ServiceResult<Option<i64>> {
        Ok(self
            .find_issue(key)
            .await?
            .and_then(|ticket| ticket.remaining_estimate_seconds))
    }
}

#[async_trait]
pub trait WorklogService: Send + Sync {
    async fn post_worklog(&self, worklog: &PreparedWorklog) -> ServiceResult<PostedWorklog>;
    /// Keys of all accounts worklogs can be attributed to.
    async fn list_accounts(&self) -> ServiceResult<Vec<String>>;
    async fn list_worklogs(&self, author_account_id: &str, date: NaiveDate) -> ServiceResult<Vec<LoggedWorklog>>;
    async fn delete_worklog(&self, worklog_id: i64) -> ServiceResult<bool>;
}

fn parse_timestamp(value: &str) -> ServiceResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Local))
        .map_err(|err| ApiError::Serialization(format!("timestamp '{}': {}", value, err)))
}

fn convert_time_entry(entry: TimeEntry) -> ServiceResult<RawTimeEntry> {
    Ok(RawTimeEntry {
        id: entry.id,
        workspace_id: Some(entry.workspace_id),
        description: entry.description,
        duration_seconds: entry.duration,
        start: parse_timestamp(&entry.start)?,
        stop: entry.stop.as_deref().map(parse_timestamp).transpose()?,
        project_id: entry.project_id,
    })
}

#[async_trait]
impl TimeTracker for TogglClient {
    async fn fetch_entries(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<Vec<RawTimeEntry>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        self.fetch_time_entries(&from, &to)
            .await?
            .into_iter()
            .map(convert_time_entry)
            .collect()
    }

    async fn fetch_running_timer(&self) -> ServiceResult<Option<RawTimeEntry>> {
        self.fetch_current_timer()
            .await?
            .map(convert_time_entry)
            .transpose()
    }

    async fn stop_timer(&self, workspace_id: i64, entry_id: i64) -> ServiceResult<bool> {
        TogglClient::stop_timer(self, workspace_id, entry_id).await?;
        Ok(true)
    }
}

fn not_found_as_none<T>(result: ServiceResult<T>) -> ServiceResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn find_issue(&self, key: &TicketKey) -> ServiceResult<Option<ResolvedTicket>> {
        let issue = not_found_as_none(self.get_issue(key.as_str()).await)?;
        Ok(issue.map(|issue| ResolvedTicket {
            key: key.clone(),
            remaining_estimate_seconds: issue.remaining_estimate_seconds(),
            issue_id: issue.id,
        }))
    }

    async fn resolve_ticket_key(&self, issue_id: &str) -> ServiceResult<Option<String>> {
        let issue = not_found_as_none(self.get_issue(issue_id).await)?;
        Ok(issue.map(|issue| issue.key))
    }
}

fn convert_prepared(worklog: &PreparedWorklog) -> ServiceResult<WorklogCreate> {
    let issue_id = worklog.ticket.issue_id.parse::<i64>().map_err(|_| {
        ApiError::Other(format!(
            "issue id '{}' of {} is not numeric",
            worklog.ticket.issue_id, worklog.ticket.key
        ))
    })?;
    Ok(WorklogCreate {
        issue_id,
        author_account_id: worklog.author_account_id.clone(),
        time_spent_seconds: worklog.billable_seconds,
        start_date: worklog.start_date(),
        start_time: worklog.start_time(),
        description: worklog.description.clone(),
        remaining_estimate_seconds: worklog.remaining_estimate_seconds,
        attributes: worklog
            .attributes
            .iter()
            .map(|attribute| WorkAttributeValue {
                key: attribute.key.clone(),
                value: attribute.value.clone(),
            })
            .collect(),
    })
}

fn convert_worklog(worklog: Worklog) -> Option<LoggedWorklog> {
    Some(LoggedWorklog {
        id: worklog.tempo_worklog_id?,
        issue_id: worklog.issue.as_ref().and_then(|issue| issue.id_string()),
        seconds: worklog.time_spent_seconds,
        description: worklog.description,
    })
}

#[async_trait]
impl WorklogService for TempoClient {
    async fn post_worklog(&self, worklog: &PreparedWorklog) -> ServiceResult<PostedWorklog> {
        let payload = convert_prepared(worklog)?;
        let created = self.create_worklog(&payload).await?;
        Ok(PostedWorklog {
            id: created.tempo_worklog_id,
        })
    }

    async fn list_accounts(&self) -> ServiceResult<Vec<String>> {
        Ok(self
            .accounts()
            .await?
            .into_iter()
            .map(|account| account.key)
            .collect())
    }

    async fn list_worklogs(&self, author_account_id: &str, date: NaiveDate) -> ServiceResult<Vec<LoggedWorklog>> {
        let day = date.format("%Y-%m-%d").to_string();
        let worklogs = self.worklogs_for_user(author_account_id, &day, &day).await?;
        Ok(worklogs.into_iter().filter_map(convert_worklog).collect())
    }

    async fn delete_worklog(&self, worklog_id: i64) -> ServiceResult<bool> {
        TempoClient::delete_worklog(self, worklog_id).await?;
        Ok(true)
    }
}
