//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// API request returned a non-success status
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport failure description
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// What was wrong with the body
        message: String,
    },

    /// Every attempt against the API failed
    #[error("Auth or network error after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Calls made, first one included
        attempts: u32,
        /// Message of the last failure
        message: String,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        /// Offending path
        path: String,
        /// Underlying error
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is misconfigured
        message: String,
    },

    /// Target language has no registered configuration
    #[error("Unsupported language: {code}")]
    UnsupportedLanguage {
        /// Requested language code
        code: String,
    },

    /// A scheduled task went away before reporting its result
    #[error("Task aborted before completion")]
    TaskAborted,

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TranslationError {
    /// Build a [`TranslationError::FileError`] for `path`
    pub fn file(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        TranslationError::FileError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Build a [`TranslationError::ConfigError`]
    pub fn config(message: impl Into<String>) -> Self {
        TranslationError::ConfigError {
            message: message.into(),
        }
    }

    /// Whether the failure came from talking to the API rather than local I/O
    pub fn is_api_failure(&self) -> bool {
        matches!(
            self,
            TranslationError::ApiError { .. }
                | TranslationError::NetworkError { .. }
                | TranslationError::InvalidResponseError { .. }
                | TranslationError::RetriesExhausted { .. }
                | TranslationError::HttpError(_)
        )
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_keeps_message() {
        let err = TranslationError::RetriesExhausted {
            attempts: 4,
            message: "API error: 401 - invalid key".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("4 attempts"));
        assert!(text.contains("invalid key"));
        assert!(err.is_api_failure());
    }

    #[test]
    fn test_file_error_is_not_api_failure() {
        let err = TranslationError::file(std::path::Path::new("docs/zh/a.md"), "denied");
        assert_eq!(err.to_string(), "File error: docs/zh/a.md - denied");
        assert!(!err.is_api_failure());
    }
}
