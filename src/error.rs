//! Error types for each pipeline stage.
//!
//! Every stage has its own error enum so the runner can tell a transport
//! failure from a malformed payload or a broken snapshot file. All of them
//! fold into [`SourceError`], which never leaves the runner: the orchestrator
//! only ever sees a [`crate::models::RunResult`].

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a raw payload from a remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Connection, timeout, TLS or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Every attempt failed; `last` is the final attempt's error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self, retry_statuses: &std::ops::RangeInclusive<u16>) -> bool {
        match self {
            FetchError::Status { status, .. } => retry_statuses.contains(status),
            FetchError::Transport(e) => !(e.is_builder() || e.is_redirect()),
            FetchError::Exhausted { .. } => false,
        }
    }
}

/// The raw payload could not be turned into records at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is missing `{0}`")]
    MissingStructure(&'static str),
}

/// Reading or writing a day's snapshot failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Anything that can stop a single source's run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SourceError {
    /// Short stage label used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            SourceError::Fetch(_) => "fetch",
            SourceError::Parse(_) => "parse",
            SourceError::Storage(_) => "storage",
        }
    }
}

/// Startup configuration problems. These are the only errors that abort the
/// process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown source `{0}` (expected one of 36KR, GITHUB, JUEJIN, SSPAI)")]
    UnknownSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_retry_follows_configured_range() {
        let err = FetchError::Status {
            status: 503,
            url: "https://example.test".into(),
        };
        assert!(err.is_retryable(&(400..=599)));
        assert!(err.is_retryable(&(500..=599)));

        let not_found = FetchError::Status {
            status: 404,
            url: "https://example.test".into(),
        };
        assert!(!not_found.is_retryable(&(500..=599)));
    }

    #[test]
    fn exhausted_is_terminal() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(FetchError::Status {
                status: 500,
                url: "https://example.test".into(),
            }),
        };
        assert!(!err.is_retryable(&(400..=599)));
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn source_error_reports_stage() {
        let err: SourceError = ParseError::MissingStructure("data").into();
        assert_eq!(err.stage(), "parse");
        assert_eq!(err.to_string(), "payload is missing `data`");
    }
}
