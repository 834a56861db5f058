//! Guard against syncing today while a time-tracker timer is still running.

use chrono::{DateTime, Local};

use crate::error::{Result, SyncError};
use crate::format::format_time;
use crate::prompt::{confirm, Terminal};
use crate::services::TimeTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCheck {
    Idle,
    Stopped,
    Declined,
}

/// Seconds since `start`, never negative.
pub fn elapsed_seconds(start: DateTime<Local>, now: DateTime<Local>) -> i64 {
    (now - start).num_seconds().max(0)
}

/// Offers to stop a running timer. `Declined` means the caller should abort cleanly.
pub async fn guard_running_timer<T>(
    tracker: &dyn TimeTracker,
    terminal: &T,
    now: DateTime<Local>,
) -> Result<TimerCheck>
where
    T: Terminal + ?Sized,
{
    let running = tracker
        .fetch_running_timer()
        .await
        .map_err(|err| SyncError::api("Failed to fetch running timer", err))?;
    let Some(entry) = running else {
        return Ok(TimerCheck::Idle);
    };

    log::warn!(
        "Timer is still running: {} ({})",
        entry.description.as_deref().unwrap_or("<no description>"),
        format_time(elapsed_seconds(entry.start, now))
    );
    if !confirm(terminal, "Stop running timer? (y/n) ").await? {
        return Ok(TimerCheck::Declined);
    }

    let Some(workspace_id) = entry.workspace_id else {
        return Err(SyncError::Aborted(
            "running timer has no workspace, stop it manually".into(),
        ));
    };
    let stopped = tracker
        .stop_timer(workspace_id, entry.id)
        .await
        .map_err(|err| SyncError::api("Failed to stop running timer", err))?;
    if !stopped {
        return Err(SyncError::Aborted("running timer could not be stopped".into()));
    }
    log::info!("✓ Timer stopped");
    Ok(TimerCheck::Stopped)
}
