use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::mpsc;

/// Filesystem lifecycle event for a path under a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// A file appeared (created or renamed in).
    Added(PathBuf),
    /// A file disappeared (deleted or renamed away).
    Removed(PathBuf),
}

/// Error type for filesystem watch operations
#[derive(Debug, Error)]
pub enum FileWatchError {
    #[error("failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },
}

/// Raw filesystem watch primitive
///
/// Emits add/remove events for paths directly under a directory. The watch
/// lives as long as the implementor; dropping it ends the event stream.
pub trait FileWatcher: Send {
    /// Start watching `dir` and return its event stream.
    fn watch(&mut self, dir: &Path) -> Result<mpsc::UnboundedReceiver<FileEvent>, FileWatchError>;
}
