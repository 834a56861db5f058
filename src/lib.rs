//! Sync Toggl Track time entries into Tempo worklogs, validated against Jira.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

pub mod accounts;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod estimate;
pub mod format;
pub mod issue_cache;
pub mod listing;
pub mod merge;
pub mod model;
pub mod posting;
pub mod prompt;
pub mod rounding;
pub mod services;
pub mod summary;
pub mod sync;
pub mod ticket;
pub mod timer;

#[cfg(test)]
mod testing;

pub use error::{Result, SyncError};

/// Entry point of the binary: loads `.env`, sets up logging, runs the command and maps the outcome to an exit code.
pub async fn run() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .try_init();
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let cli = cli::Cli::parse();
    match cli::dispatch(cli).await {
        Ok(status) => status.exit_code(),
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
