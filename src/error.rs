//! Application error types

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}")]
    Upstream {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Refresh cycle superseded")]
    Superseded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry with backoff can reasonably succeed.
    ///
    /// HTTP 429/503 (and other 5xx), network-level failures and timeouts are
    /// transient; everything else is permanent and handed straight to the
    /// fallback path.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Upstream { status, .. } => *status == 429 || (500..=599).contains(status),
            AppError::Http(err) => err.is_timeout() || err.is_connect(),
            AppError::Timeout => true,
            _ => false,
        }
    }

    /// Upstream-supplied retry hint, when one was present (Retry-After).
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::Upstream { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Serializable error response for the frontend shell
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::Provider(_) => "PROVIDER_ERROR",
            AppError::Parse(_) => "PARSE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Timeout => "TIMEOUT",
            AppError::Superseded => "SUPERSEDED",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
