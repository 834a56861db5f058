//! In-memory collaborators and builders shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use worklog_api::ApiError;

use crate::model::{LoggedWorklog, MergedEntry, PostedWorklog, PreparedWorklog, RawTimeEntry, ResolvedTicket};
use crate::prompt::Terminal;
use crate::services::{IssueTracker, ServiceResult, TimeTracker, WorklogService};
use crate::ticket::{TicketKey, TicketPattern};

pub fn key(value: &str) -> TicketKey {
    TicketPattern::default_pattern()
        .parse(value)
        .expect("valid ticket key")
}

fn base_start() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn raw(id: i64, description: Option<&str>, duration_seconds: i64) -> RawTimeEntry {
    let start = base_start() + Duration::minutes(id);
    RawTimeEntry {
        id,
        workspace_id: Some(1),
        description: description.map(str::to_string),
        duration_seconds,
        start,
        stop: (duration_seconds >= 0).then(|| start + Duration::seconds(duration_seconds)),
        project_id: None,
    }
}

pub fn merged(id: i64, description: Option<&str>, duration_seconds: i64) -> MergedEntry {
    MergedEntry {
        id,
        description: description.map(str::to_string),
        duration_seconds,
        start: base_start(),
        project_id: None,
        source_ids: vec![id],
    }
}

pub fn ticket(value: &str, remaining_estimate_seconds: Option<i64>) -> ResolvedTicket {
    ResolvedTicket {
        key: key(value),
        issue_id: "10001".to_string(),
        remaining_estimate_seconds,
    }
}

pub fn prepared(ticket_key: &str, description: &str, seconds: i64) -> PreparedWorklog {
    PreparedWorklog {
        ticket: ticket(ticket_key, None),
        description: description.to_string(),
        billable_seconds: seconds,
        start: base_start(),
        author_account_id: "author".to_string(),
        remaining_estimate_seconds: None,
        estimate_basis: None,
        attributes: Vec::new(),
    }
}

pub fn logged(id: i64, issue_id: Option<&str>, seconds: i64, description: &str) -> LoggedWorklog {
    LoggedWorklog {
        id,
        issue_id: issue_id.map(str::to_string),
        seconds,
        description: Some(description.to_string()),
    }
}

/// Ordered record of events across fakes, for asserting on interleaving.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Replays scripted answers; running out of answers is an EOF error.
pub struct ScriptedTerminal {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, message: &str) -> io::Result<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        if let Some(journal) = &self.journal {
            journal.record(format!("prompt: {}", message));
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn read_line(&self, message: &str) -> io::Result<String> {
        self.next(message)
    }

    async fn read_key(&self, message: &str) -> io::Result<String> {
        self.next(message)
    }
}

#[derive(Default)]
pub struct FakeTimeTracker {
    entries: Vec<RawTimeEntry>,
    running: Option<RawTimeEntry>,
    fail_timer: bool,
    fetched: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    stopped: Mutex<Vec<(i64, i64)>>,
}

impl FakeTimeTracker {
    pub fn new(entries: Vec<RawTimeEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn with_running(mut self, entry: RawTimeEntry) -> Self {
        self.running = Some(entry);
        self
    }

    pub fn failing_timer(mut self) -> Self {
        self.fail_timer = true;
        self
    }

    pub fn fetched_ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<(i64, i64)> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimeTracker for FakeTimeTracker {
    async fn fetch_entries(&self, from: NaiveDate, to: NaiveDate) -> ServiceResult<Vec<RawTimeEntry>> {
        self.fetched.lock().unwrap().push((from, to));
        Ok(self.entries.clone())
    }

    async fn fetch_running_timer(&self) -> ServiceResult<Option<RawTimeEntry>> {
        if self.fail_timer {
            return Err(ApiError::Network("connection refused".into()));
        }
        Ok(self.running.clone())
    }

    async fn stop_timer(&self, workspace_id: i64, entry_id: i64) -> ServiceResult<bool> {
        self.stopped.lock().unwrap().push((workspace_id, entry_id));
        Ok(true)
    }
}

/// Issue tracker knowing a fixed set of keys; issue ids are `10000 + position`.
#[derive(Default)]
pub struct FakeIssueTracker {
    ids: HashMap<TicketKey, String>,
    estimates: HashMap<TicketKey, i64>,
    failing: HashSet<TicketKey>,
    find_calls: AtomicUsize,
    key_calls: AtomicUsize,
}

impl FakeIssueTracker {
    pub fn new<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ids = keys
            .into_iter()
            .enumerate()
            .map(|(index, value)| (key(value), (10000 + index).to_string()))
            .collect();
        Self {
            ids,
            ..Self::default()
        }
    }

    pub fn with_estimate(mut self, ticket: &str, seconds: i64) -> Self {
        self.estimates.insert(key(ticket), seconds);
        self
    }

    pub fn failing_on(mut self, ticket: &str) -> Self {
        self.failing.insert(key(ticket));
        self
    }

    pub fn issue_id_of(&self, ticket: &str) -> String {
        self.ids[&key(ticket)].clone()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueTracker for FakeIssueTracker {
    async fn find_issue(&self, key: &TicketKey) -> ServiceResult<Option<ResolvedTicket>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(key) {
            return Err(ApiError::Timeout("issue lookup".into()));
        }
        Ok(self.ids.get(key).map(|issue_id| ResolvedTicket {
            key: key.clone(),
            issue_id: issue_id.clone(),
            remaining_estimate_seconds: self.estimates.get(key).copied(),
        }))
    }

    async fn resolve_ticket_key(&self, issue_id: &str) -> ServiceResult<Option<String>> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .ids
            .iter()
            .find(|(_, id)| id.as_str() == issue_id)
            .map(|(key, _)| key.to_string()))
    }
}

pub struct FakeWorklogService {
    accounts: Vec<String>,
    logged: Vec<LoggedWorklog>,
    fail_post_for: Option<String>,
    fail_delete_for: Option<i64>,
    omit_ids: bool,
    fail_accounts: bool,
    journal: Option<Journal>,
    next_id: AtomicI64,
    post_calls: AtomicUsize,
    account_calls: AtomicUsize,
    posted: Mutex<Vec<PreparedWorklog>>,
    deleted: Mutex<Vec<i64>>,
}

impl FakeWorklogService {
    pub fn new<'a, I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            accounts: accounts.into_iter().map(str::to_string).collect(),
            logged: Vec::new(),
            fail_post_for: None,
            fail_delete_for: None,
            omit_ids: false,
            fail_accounts: false,
            journal: None,
            next_id: AtomicI64::new(1000),
            post_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Posts whose description equals `description` are rejected.
    pub fn failing_post_for(mut self, description: &str) -> Self {
        self.fail_post_for = Some(description.to_string());
        self
    }

    pub fn failing_delete_for(mut self, worklog_id: i64) -> Self {
        self.fail_delete_for = Some(worklog_id);
        self
    }

    pub fn failing_accounts(mut self) -> Self {
        self.fail_accounts = true;
        self
    }

    pub fn without_ids(mut self) -> Self {
        self.omit_ids = true;
        self
    }

    pub fn with_logged(mut self, logged: Vec<LoggedWorklog>) -> Self {
        self.logged = logged;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<PreparedWorklog> {
        self.posted.lock().unwrap().clone()
    }

    pub fn posted_descriptions(&self) -> Vec<String> {
        self.posted()
            .into_iter()
            .map(|worklog| worklog.description)
            .collect()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorklogService for FakeWorklogService {
    async fn post_worklog(&self, worklog: &PreparedWorklog) -> ServiceResult<PostedWorklog> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.record(format!("post: {}", worklog.description));
        }
        if self.fail_post_for.as_deref() == Some(worklog.description.as_str()) {
            return Err(ApiError::Other("worklog rejected".into()));
        }
        self.posted.lock().unwrap().push(worklog.clone());
        if self.omit_ids {
            return Ok(PostedWorklog { id: None });
        }
        Ok(PostedWorklog {
            id: Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
        })
    }

    async fn list_accounts(&self) -> ServiceResult<Vec<String>> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_accounts {
            return Err(ApiError::Timeout("account list".into()));
        }
        Ok(self.accounts.clone())
    }

    async fn list_worklogs(&self, _author: &str, _date: NaiveDate) -> ServiceResult<Vec<LoggedWorklog>> {
        Ok(self.logged.clone())
    }

    async fn delete_worklog(&self, worklog_id: i64) -> ServiceResult<bool> {
        if self.fail_delete_for == Some(worklog_id) {
            return Err(ApiError::NotFound(format!("worklogs/{}", worklog_id)));
        }
        self.deleted.lock().unwrap().push(worklog_id);
        Ok(true)
    }
}
