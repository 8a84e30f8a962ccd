use std::path::PathBuf;

use thiserror::Error;

use super::ports::PageDriverError;

/// Process exit code for an unrecoverable startup failure (unusable download
/// directory, browser launch failure).
pub const EXIT_STARTUP_FAILURE: i32 = 5;

/// Process exit code for a fatal error inside the workflow (download move
/// failure, exhausted retries, authentication failure).
pub const EXIT_WORKFLOW_FATAL: i32 = 6;

/// Errors raised by the download coordinator.
///
/// Timeout is an expected per-cycle outcome; every other variant means the
/// download or the directory it lives in is unusable.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("no completed download within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("download directory unusable: {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("filesystem watch failed: {0}")]
    Watch(String),
}

impl DownloadError {
    /// Whether this error is the per-cycle timeout (retryable) rather than a
    /// fatal filesystem condition.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Top-level workflow errors. The engine is the only component that maps
/// these to process termination.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("browser startup failed: {0}")]
    Browser(String),

    #[error("authentication failed: {0}")]
    Authentication(#[source] PageDriverError),

    #[error("startup failed: {0}")]
    Startup(#[source] DownloadError),

    #[error("download failed: {0}")]
    Download(#[source] DownloadError),

    #[error("gave up after {failures} consecutive failed cycles")]
    RetriesExhausted { failures: u32 },
}

impl WorkflowError {
    /// Exit code the process should terminate with for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Browser(_) | Self::Startup(_) => EXIT_STARTUP_FAILURE,
            Self::Authentication(_) | Self::Download(_) | Self::RetriesExhausted { .. } => {
                EXIT_WORKFLOW_FATAL
            }
        }
    }
}
