//! notify-backed filesystem watch adapter.
//!
//! Bridges OS filesystem notifications into a tokio channel of the domain's
//! [`FileEvent`]s. On inotify platforms a rename surfaces as paired
//! name-change events rather than remove/create, so both shapes map onto the
//! same add/remove stream the download coordinator consumes.

use std::path::Path;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::domain::ports::{FileEvent, FileWatchError, FileWatcher};

/// Filesystem watcher over the platform's native notification API.
///
/// The OS watch is released when this value drops, which also ends the event
/// stream handed out by [`FileWatcher::watch`].
pub struct NotifyFileWatcher {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyFileWatcher {
    /// Create an idle watcher.
    pub const fn new() -> Self {
        Self { watcher: None }
    }
}

impl Default for NotifyFileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatcher for NotifyFileWatcher {
    fn watch(&mut self, dir: &Path) -> Result<mpsc::UnboundedReceiver<FileEvent>, FileWatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
            match result {
                Ok(event) => forward(&tx, event),
                Err(error) => warn!(%error, "filesystem watch error"),
            }
        })
        .map_err(|error| FileWatchError::Watch {
            path: dir.to_path_buf(),
            message: error.to_string(),
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|error| FileWatchError::Watch {
                path: dir.to_path_buf(),
                message: error.to_string(),
            })?;

        self.watcher = Some(watcher);
        Ok(rx)
    }
}

/// Map one raw notification onto add/remove events.
fn forward(tx: &mpsc::UnboundedSender<FileEvent>, event: Event) {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in event.paths {
                let _ = tx.send(FileEvent::Added(path));
            }
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in event.paths {
                let _ = tx.send(FileEvent::Removed(path));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths come ordered as [old, new]
            let mut paths = event.paths.into_iter();
            if let Some(old) = paths.next() {
                let _ = tx.send(FileEvent::Removed(old));
            }
            if let Some(new) = paths.next() {
                let _ = tx.send(FileEvent::Added(new));
            }
        }
        kind => trace!(?kind, "ignoring filesystem event"),
    }
}
