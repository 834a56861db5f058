mod jira;
mod tempo;
mod toggl;

pub use jira::{Issue, IssueFields, TimeTracking};
pub use tempo::{Account, Page, PageMetadata, WorkAttributeValue, Worklog, WorklogCreate, WorklogIssue};
pub use toggl::TimeEntry;
