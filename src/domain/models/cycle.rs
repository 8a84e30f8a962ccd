use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::super::error::WorkflowError;

/// State of the outer workflow loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Acquiring browser resources and loading the target surface.
    Init,
    /// Performing the SSO handoff and credential entry.
    Authenticating,
    /// Surface loaded, waiting to start the next cycle.
    Ready,
    /// Driving the scripted export request.
    Exporting,
    /// Waiting for the download to settle.
    AwaitingDownload,
    /// Resetting the surface between cycles.
    Reloading,
    /// Loop ended; resources released.
    Terminated,
}

impl WorkflowState {
    /// Stable lowercase name for log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Exporting => "exporting",
            Self::AwaitingDownload => "awaiting_download",
            Self::Reloading => "reloading",
            Self::Terminated => "terminated",
        }
    }
}

/// One iteration of the outer loop. Created at the top of the iteration and
/// consumed immediately to decide control flow; only the ordinal survives
/// across iterations.
#[derive(Debug, Clone)]
pub struct WorkflowCycle {
    /// 1-based iteration counter.
    pub ordinal: u64,
    /// When the iteration started.
    pub started_at: DateTime<Utc>,
}

impl WorkflowCycle {
    /// Start a new cycle record.
    pub fn new(ordinal: u64) -> Self {
        Self {
            ordinal,
            started_at: Utc::now(),
        }
    }

    /// Milliseconds elapsed since the cycle started.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

/// How a cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The export settled; the artifact now lives at its final path.
    Success {
        /// Final renamed artifact location.
        artifact: PathBuf,
    },
    /// The cycle failed but the surface is presumed still usable.
    Retryable {
        /// Human-readable failure description for the log.
        reason: String,
    },
    /// The cycle failed in a way that ends the process.
    Fatal(WorkflowError),
}

impl CycleOutcome {
    /// Stable lowercase name for log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Retryable { .. } => "retryable",
            Self::Fatal(_) => "fatal",
        }
    }
}
