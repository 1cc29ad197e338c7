//! Error types for elisio-ui
//!
//! Transport and server errors are kept apart from input validation: the
//! former leave the UI in a retryable transient-error state, the latter are
//! reported inline (see `verse::VerseInputError`).

use thiserror::Error;

/// Errors returned by the HTTP API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with an unexpected status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Session lacks the rights for this operation (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// No `csrftoken` cookie available for a mutating request
    #[error("No anti-forgery token available for {0}")]
    MissingCsrfToken(String),

    /// Request parameters rejected before sending
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// elisio-common error
    #[error("Common error: {0}")]
    Common(#[from] elisio_common::Error),
}

impl ApiError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Result type for API client calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors from talking to the selector service
#[derive(Debug, Error)]
pub enum UiError {
    /// The service task has shut down
    #[error("Selector service stopped")]
    ServiceStopped,
}

pub type UiResult<T> = Result<T, UiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Network("timeout".into()).is_transient());
        assert!(ApiError::Status { status: 502, body: String::new() }.is_transient());
        assert!(!ApiError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!ApiError::Forbidden("/json/batches/".into()).is_transient());
        assert!(!ApiError::Parse("eof".into()).is_transient());
    }
}
