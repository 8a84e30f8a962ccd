//! Integration tests for the notify-backed watch adapter against a real
//! filesystem.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use reportd::domain::ports::{FileEvent, FileWatcher};
use reportd::infrastructure::watcher::NotifyFileWatcher;

/// Drain events until one matches, or fail after `wait`.
async fn expect_event<F>(
    rx: &mut mpsc::UnboundedReceiver<FileEvent>,
    wait: Duration,
    mut pred: F,
) -> FileEvent
where
    F: FnMut(&FileEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .unwrap_or(Duration::ZERO);
        match timeout(remaining, rx.recv()).await {
            Ok(Some(event)) if pred(&event) => return event,
            Ok(Some(_)) => {}
            Ok(None) => panic!("watch stream ended unexpectedly"),
            Err(_) => panic!("no matching event within {wait:?}"),
        }
    }
}

fn file_name_is(event: &FileEvent, name: &str) -> bool {
    let path = match event {
        FileEvent::Added(path) | FileEvent::Removed(path) => path,
    };
    path.file_name().and_then(|n| n.to_str()) == Some(name)
}

#[tokio::test]
async fn reports_the_marker_download_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut watcher = NotifyFileWatcher::new();
    let mut events = watcher.watch(dir.path()).unwrap();

    // let the OS watch arm before producing events
    tokio::time::sleep(Duration::from_millis(200)).await;

    let marker = dir.path().join("report.csv.crdownload");
    std::fs::write(&marker, b"partial").unwrap();
    let added = expect_event(&mut events, Duration::from_secs(5), |event| {
        matches!(event, FileEvent::Added(_)) && file_name_is(event, "report.csv.crdownload")
    })
    .await;
    assert!(matches!(added, FileEvent::Added(_)));

    // provider finishes: rename to the final name
    std::fs::rename(&marker, dir.path().join("report.csv")).unwrap();
    expect_event(&mut events, Duration::from_secs(5), |event| {
        matches!(event, FileEvent::Removed(_)) && file_name_is(event, "report.csv.crdownload")
    })
    .await;

    std::fs::remove_file(dir.path().join("report.csv")).unwrap();
    expect_event(&mut events, Duration::from_secs(5), |event| {
        matches!(event, FileEvent::Removed(_)) && file_name_is(event, "report.csv")
    })
    .await;
}

#[tokio::test]
async fn watching_a_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let mut watcher = NotifyFileWatcher::new();
    assert!(watcher.watch(&missing).is_err());
}
