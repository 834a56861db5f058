//! Fatal conditions that abort a run. Skips and failed posts are values, not errors.

use thiserror::Error;
use worklog_api::ApiError;

use crate::config::ConfigError;
use crate::prompt::PromptError;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("invalid date '{0}', expected today, yesterday or YYYY-MM-DD")]
    InvalidDate(String),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ApiError,
    },
    #[error("{0}")]
    Aborted(String),
}

impl SyncError {
    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        SyncError::Api {
            context: context.into(),
            source,
        }
    }
}
