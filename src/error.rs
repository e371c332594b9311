//! Error types for social-dl
//!
//! Most failures in this crate are recovered locally (a failed media item
//! becomes a failed post, a malformed input file is skipped). The variants
//! below are what those local recoveries log, and what the few fallible
//! public entry points return.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for social-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for social-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_root")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// The status code returned by the server
        status: u16,
        /// The requested URL
        url: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An input file does not describe a downloadable post
    #[error("invalid post file {path}: {reason}")]
    InvalidPost {
        /// The input file that was rejected
        path: PathBuf,
        /// Why the file was rejected
        reason: String,
    },

    /// The run was interrupted before it finished
    #[error("run interrupted ({})", history_note(.history_saved))]
    Interrupted {
        /// Whether the history committed before the interruption was written
        history_saved: bool,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error came from the network layer (connection, timeout, HTTP status)
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::HttpStatus { .. })
    }
}

fn history_note(saved: &bool) -> &'static str {
    if *saved {
        "download history saved"
    } else {
        "download history could not be saved"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_key() {
        let err = Error::config("download.max_concurrent_downloads", "must be at least 1");
        match &err {
            Error::Config { message, key } => {
                assert_eq!(message, "must be at least 1");
                assert_eq!(key.as_deref(), Some("download.max_concurrent_downloads"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "configuration error: must be at least 1"
        );
    }

    #[test]
    fn http_status_display_names_url() {
        let err = Error::HttpStatus {
            status: 404,
            url: "https://example.com/a.jpg".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404 for https://example.com/a.jpg");
        assert!(err.is_network());
    }

    #[test]
    fn io_errors_convert_and_are_not_network() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_network());
    }

    #[test]
    fn interrupted_display_reports_history_save() {
        assert_eq!(
            Error::Interrupted { history_saved: true }.to_string(),
            "run interrupted (download history saved)"
        );
        assert_eq!(
            Error::Interrupted { history_saved: false }.to_string(),
            "run interrupted (download history could not be saved)"
        );
    }

    #[test]
    fn invalid_post_display() {
        let err = Error::InvalidPost {
            path: PathBuf::from("data/weibo/json/u/1.json"),
            reason: "missing idstr".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid post file data/weibo/json/u/1.json: missing idstr"
        );
    }
}
