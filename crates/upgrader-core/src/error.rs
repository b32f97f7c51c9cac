//! Error types for the upgrader library.
//!
//! Transport-level failures (connection, TLS, timeout) are the only errors
//! counted by the circuit breaker; payload and resolution problems are
//! absorbed per-repository by the orchestrator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for upgrader operations.
#[derive(Debug, Error)]
pub enum UpgradeError {
    // Network errors
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    // Download errors
    #[error("Download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    /// Reserved for archive-handler implementations; the core never
    /// produces it, only propagates it after staging cleanup.
    #[error("Archive handling failed for {path:?}: {message}")]
    Extraction { message: String, path: PathBuf },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for upgrader operations.
pub type Result<T> = std::result::Result<T, UpgradeError>;

impl From<std::io::Error> for UpgradeError {
    fn from(err: std::io::Error) -> Self {
        UpgradeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for UpgradeError {
    fn from(err: serde_json::Error) -> Self {
        UpgradeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl UpgradeError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        UpgradeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Wrap a reqwest error, keeping the request URL for diagnostics.
    pub fn transport(url: impl Into<String>, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpgradeError::Timeout(crate::config::NetworkConfig::CALL_TIMEOUT)
        } else {
            UpgradeError::Network {
                url: url.into(),
                message: err.to_string(),
                source: Some(err),
            }
        }
    }

    /// Check if this error counts against a circuit breaker.
    pub fn is_transport(&self) -> bool {
        matches!(self, UpgradeError::Network { .. } | UpgradeError::Timeout(_))
    }
}
