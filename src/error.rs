//! Error taxonomy for maintenance units.
//!
//! Soft failures (a command exiting non-zero, a timeout, an unreachable
//! host) are not errors: they come back as `false`. A `FlowError` means the
//! unit itself could not do its job.

use std::path::PathBuf;

use thiserror::Error;

/// Hard failure of a maintenance procedure
#[derive(Debug, Error)]
pub enum FlowError {
    /// Invalid input detected before anything was spawned
    #[error("Configuration error: {0}")]
    Config(String),

    /// The child process could not be started
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child or draining its output failed
    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level HTTP failure (DNS, refused connection, timeout)
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Stack lock file could not be created or locked
    #[error("Failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    /// Whether a declared retry policy may re-attempt after this error.
    ///
    /// Configuration errors fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FlowError::Config(_))
    }
}

pub type Result<T, E = FlowError> = std::result::Result<T, E>;
