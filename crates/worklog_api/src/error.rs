//! Error model shared by the Toggl, Tempo and Jira clients.

use std::io;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http {status}: {message}")]
    Http {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited{}", retry_after.map(|secs| format!(", retry after {}s", secs)).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl ApiError {
    pub fn http(status: StatusCode, code: Option<String>, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            code,
            message: message.into(),
        }
    }

    /// HTTP error whose message and code are taken from a Jira, Tempo or Toggl error body when it has one.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let code = parsed.as_ref().and_then(error_code);
        let message = parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| body.trim().to_string());
        ApiError::http(status, code, message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Transient failures a caller may reasonably try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } | ApiError::Timeout(_) | ApiError::Network(_) => true,
            ApiError::Http { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

fn error_code(value: &Value) -> Option<String> {
    value
        .get("code")
        .and_then(Value::as_str)
        .or_else(|| {
            value
                .get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("code"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
}

// Jira: {"errorMessages": [..], "errors": {field: msg}}; Tempo: {"errors": [{"message": ..}]}.
fn error_message(value: &Value) -> Option<String> {
    let mut messages: Vec<String> = Vec::new();
    if let Some(list) = value.get("errorMessages").and_then(Value::as_array) {
        messages.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
    }
    match value.get("errors") {
        Some(Value::Array(list)) => messages.extend(
            list.iter()
                .filter_map(|item| item.get("message").and_then(Value::as_str))
                .map(str::to_string),
        ),
        Some(Value::Object(fields)) => messages.extend(
            fields
                .iter()
                .filter_map(|(field, msg)| msg.as_str().map(|msg| format!("{}: {}", field, msg))),
        ),
        _ => {}
    }
    if messages.is_empty() {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            messages.push(message.to_string());
        }
    }
    (!messages.is_empty()).then(|| messages.join("; "))
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status == StatusCode::NOT_FOUND {
                return ApiError::NotFound(err.to_string());
            }
            ApiError::http(status, None, err.to_string())
        } else if err.is_connect() {
            ApiError::Network(err.to_string())
        } else if err.is_decode() {
            ApiError::Serialization(err.to_string())
        } else {
            ApiError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}
