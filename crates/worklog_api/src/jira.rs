//! Jira Cloud REST v3 client, limited to issue lookups with time tracking.

use crate::config::ApiConfig;
use crate::error::Result;
use crate::http::Transport;
use crate::models::Issue;
use crate::rate_limiter::RateLimiter;

const ISSUE_FIELDS: &str = "timetracking";

#[derive(Clone)]
pub struct JiraClient {
    transport: Transport,
}

impl JiraClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    pub fn new_with_limiter(config: ApiConfig, limiter: RateLimiter) -> Result<Self> {
        Ok(Self {
            transport: Transport::new_with_limiter(config, limiter)?,
        })
    }

    /// Looks an issue up by key (`DEV-12`) or numeric id; a missing issue is `ApiError::NotFound`.
    pub async fn get_issue(&self, key_or_id: &str) -> Result<Issue> {
        let path = format!("issue/{}", key_or_id);
        self.transport
            .get_with_query(&path, Some(&[("fields", ISSUE_FIELDS)]))
            .await
    }
}
