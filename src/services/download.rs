//! Download settlement tracking from filesystem lifecycle events.
//!
//! Download providers write into a temp directory under an in-progress marker
//! name (`report.csv.crdownload`) and rename to the final name when done. The
//! coordinator watches the marker lifecycle: the marker's *add* records that
//! a download began, its *removal* signals that the provider finished writing
//! and renamed. On settlement the finished artifact is moved out of the temp
//! directory into its final, tag-namespaced location.
//!
//! Arrival state is encapsulated here and observable only through
//! [`DownloadCoordinator::await_settlement`]; each cycle gets exactly one
//! race-free answer to "has this cycle's download settled".

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::error::DownloadError;
use crate::domain::models::DownloadConfig;
use crate::domain::ports::FileEvent;

/// Coordinates the two-phase download lifecycle for one temp directory.
///
/// The filesystem subscription lives for the process lifetime; only the
/// per-cycle wait resolves or times out. Events that arrive between cycles
/// stay queued and are processed at the start of the next wait, so a download
/// finishing just after a timeout is credited to the following cycle rather
/// than lost.
pub struct DownloadCoordinator {
    temp_dir: PathBuf,
    final_dir: PathBuf,
    tag: String,
    marker_suffix: String,
    events: mpsc::UnboundedReceiver<FileEvent>,
    /// Markers seen added and not yet removed. Persists across cycles: a
    /// download that arrives near the end of one cycle may legally settle in
    /// the next.
    pending: HashSet<PathBuf>,
}

impl DownloadCoordinator {
    /// Create a coordinator over a watch subscription scoped to the config's
    /// temp directory.
    pub fn new(events: mpsc::UnboundedReceiver<FileEvent>, config: &DownloadConfig) -> Self {
        Self {
            temp_dir: config.temp_dir(),
            final_dir: config.root_dir.clone(),
            tag: config.tag.clone(),
            marker_suffix: config.marker_suffix.clone(),
            events,
            pending: HashSet::new(),
        }
    }

    /// Ensure the temp download directory exists.
    ///
    /// Idempotent: an already-existing directory is not an error. Any other
    /// filesystem failure is fatal and propagates.
    pub async fn prepare(config: &DownloadConfig) -> Result<(), DownloadError> {
        let temp_dir = config.temp_dir();
        tokio::fs::create_dir_all(&temp_dir)
            .await
            .map_err(|source| DownloadError::Directory {
                path: temp_dir.clone(),
                source,
            })
    }

    /// Temp directory this coordinator tracks.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Wait for the next download to settle, bounded by `timeout`.
    ///
    /// Resolves with the final artifact path once a tracked marker has been
    /// removed and the finished file has been moved into the final directory.
    /// On expiry the subscription stays armed; only this wait ends.
    pub async fn await_settlement(&mut self, timeout: Duration) -> Result<PathBuf, DownloadError> {
        let deadline = sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => {
                    return Err(DownloadError::Timeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                event = self.events.recv() => match event {
                    Some(event) => {
                        if let Some(path) = self.apply(event).await? {
                            return Ok(path);
                        }
                    }
                    None => {
                        return Err(DownloadError::Watch(
                            "filesystem watch stream ended".to_string(),
                        ));
                    }
                },
            }
        }
    }

    /// Apply one watch event. Returns the final path when a download settled.
    async fn apply(&mut self, event: FileEvent) -> Result<Option<PathBuf>, DownloadError> {
        match event {
            FileEvent::Added(path) => {
                if !self.is_marker(&path) {
                    debug!(path = %path.display(), "ignoring non-marker arrival");
                    return Ok(None);
                }
                debug!(path = %path.display(), "download started");
                self.pending.insert(path);
                Ok(None)
            }
            FileEvent::Removed(path) => {
                if !self.is_marker(&path) {
                    debug!(path = %path.display(), "ignoring non-marker removal");
                    return Ok(None);
                }
                if !self.pending.remove(&path) {
                    warn!(
                        path = %path.display(),
                        "marker removed without a recorded arrival, ignoring"
                    );
                    return Ok(None);
                }
                let Some(base) = self.base_name(&path) else {
                    warn!(path = %path.display(), "marker has no base name, ignoring");
                    return Ok(None);
                };
                self.settle(&base).await.map(Some)
            }
        }
    }

    /// Move a finished download into its final, tag-namespaced location.
    async fn settle(&self, base: &str) -> Result<PathBuf, DownloadError> {
        let from = self.temp_dir.join(base);
        let to = self.final_dir.join(format!("{}_{}", self.tag, base));
        debug!(from = %from.display(), to = %to.display(), "moving finished download");
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|source| DownloadError::Move {
                from: from.clone(),
                to: to.clone(),
                source,
            })?;
        info!(path = %to.display(), "download settled");
        Ok(to)
    }

    fn is_marker(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.marker_suffix))
    }

    /// Final base name with the marker suffix stripped.
    fn base_name(&self, path: &Path) -> Option<String> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(self.marker_suffix.as_str()))
            .map(str::to_owned)
    }
}
