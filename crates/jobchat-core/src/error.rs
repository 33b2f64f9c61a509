//! Client error types

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the backend binding and the client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, TLS, body read)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("api error: {status} - {message}")]
    Api {
        status: u16,
        message: String,
        /// Server-provided Retry-After hint
        retry_after: Option<Duration>,
    },

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A job was about to be created without a resolved chat id
    #[error("missing conversation id to create a job")]
    MissingChat,

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ClientError::Api {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_and_status() {
        let err = ClientError::api(404, "Job not found");
        assert_eq!(err.to_string(), "api error: 404 - Job not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_non_api_errors_have_no_status() {
        assert_eq!(ClientError::MissingChat.status(), None);
        assert_eq!(ClientError::Config("bad".into()).status(), None);
    }
}
