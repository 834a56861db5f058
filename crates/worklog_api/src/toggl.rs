//! Toggl Track v9 client: time entries and the running timer.

use crate::config::ApiConfig;
use crate::error::Result;
use crate::http::Transport;
use crate::models::TimeEntry;
use crate::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct TogglClient {
    transport: Transport,
}

impl TogglClient {
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

    /// Entries starting in `[start_date, end_date)`, both `YYYY-MM-DD`.
    pub async fn fetch_time_entries(&self, start_date: &str, end_date: &str) -> Result<Vec<TimeEntry>> {
        self.transport
            .get_with_query(
                "me/time_entries",
                Some(&[("start_date", start_date), ("end_date", end_date)]),
            )
            .await
    }

    pub async fn fetch_current_timer(&self) -> Result<Option<TimeEntry>> {
        self.transport.get("me/time_entries/current").await
    }

    pub async fn stop_timer(&self, workspace_id: i64, entry_id: i64) -> Result<()> {
        let path = format!("workspaces/{}/time_entries/{}/stop", workspace_id, entry_id);
        self.transport.patch_empty(&path).await
    }
}
