//! Typed clients for the services a time sync talks to: Toggl Track (source
//! time entries), Tempo (worklogs and accounts) and Jira (issue lookup).

pub mod config;
pub mod error;
pub mod http;
pub mod jira;
pub mod models;
pub mod rate_limiter;
pub mod tempo;
pub mod toggl;

pub use config::{ApiConfig, AuthMethod};
pub use error::{ApiError, Result};
pub use jira::JiraClient;
pub use models::{
    Account, Issue, Page, PageMetadata, TimeEntry, TimeTracking, WorkAttributeValue, Worklog,
    WorklogCreate, WorklogIssue,
};
pub use rate_limiter::RateLimiter;
pub use tempo::TempoClient;
pub use toggl::TogglClient;
