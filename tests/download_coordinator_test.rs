//! Integration tests for download settlement tracking.

mod common;

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use reportd::domain::error::DownloadError;
use reportd::domain::models::DownloadConfig;
use reportd::domain::ports::FileEvent;
use reportd::services::DownloadCoordinator;

fn download_config(root: &Path) -> DownloadConfig {
    DownloadConfig {
        root_dir: root.to_path_buf(),
        tag: "test".to_string(),
        marker_suffix: ".crdownload".to_string(),
        timeout_ms: 300,
    }
}

#[tokio::test]
async fn settles_and_moves_on_marker_removal() {
    common::setup_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());
    DownloadCoordinator::prepare(&config).await.unwrap();

    let temp = config.temp_dir();
    tokio::fs::write(temp.join("export_12345.csv"), b"a,b\n1,2\n")
        .await
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(rx, &config);

    tx.send(FileEvent::Added(temp.join("export_12345.csv.crdownload")))
        .unwrap();
    tx.send(FileEvent::Removed(temp.join("export_12345.csv.crdownload")))
        .unwrap();

    let artifact = coordinator
        .await_settlement(Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(artifact, dir.path().join("test_export_12345.csv"));
    assert!(artifact.exists());
    assert!(!temp.join("export_12345.csv").exists());
}

#[tokio::test]
async fn removal_without_arrival_never_settles() {
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());
    DownloadCoordinator::prepare(&config).await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(rx, &config);

    // stale watcher event with no preceding arrival
    tx.send(FileEvent::Removed(
        config.temp_dir().join("ghost.csv.crdownload"),
    ))
    .unwrap();

    let result = coordinator.await_settlement(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(ref err) if err.is_timeout()));
}

#[tokio::test]
async fn non_marker_events_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());
    DownloadCoordinator::prepare(&config).await.unwrap();

    let temp = config.temp_dir();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(rx, &config);

    tx.send(FileEvent::Added(temp.join("report.csv"))).unwrap();
    tx.send(FileEvent::Removed(temp.join("report.csv"))).unwrap();

    let result = coordinator.await_settlement(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(ref err) if err.is_timeout()));
}

#[tokio::test]
async fn prepare_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());

    DownloadCoordinator::prepare(&config).await.unwrap();
    DownloadCoordinator::prepare(&config).await.unwrap();

    assert!(config.temp_dir().is_dir());
}

#[tokio::test]
async fn missing_source_is_a_fatal_move_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());
    DownloadCoordinator::prepare(&config).await.unwrap();

    let temp = config.temp_dir();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(rx, &config);

    // marker lifecycle completes but the finished file is gone
    tx.send(FileEvent::Added(temp.join("lost.csv.crdownload")))
        .unwrap();
    tx.send(FileEvent::Removed(temp.join("lost.csv.crdownload")))
        .unwrap();

    let result = coordinator.await_settlement(Duration::from_secs(1)).await;
    match result {
        Err(DownloadError::Move { ref from, .. }) => {
            assert_eq!(*from, temp.join("lost.csv"));
        }
        other => panic!("expected a move error, got {other:?}"),
    }
}

#[tokio::test]
async fn arrival_before_the_wait_still_counts() {
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());
    DownloadCoordinator::prepare(&config).await.unwrap();

    let temp = config.temp_dir();
    tokio::fs::write(temp.join("late.csv"), b"x\n").await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(rx, &config);

    // arrival lands in one cycle ...
    tx.send(FileEvent::Added(temp.join("late.csv.crdownload")))
        .unwrap();
    let first = coordinator.await_settlement(Duration::from_millis(50)).await;
    assert!(matches!(first, Err(ref err) if err.is_timeout()));

    // ... and the matching removal settles the next one
    tx.send(FileEvent::Removed(temp.join("late.csv.crdownload")))
        .unwrap();
    let artifact = coordinator
        .await_settlement(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(artifact, dir.path().join("test_late.csv"));
}

#[tokio::test]
async fn ended_watch_stream_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = download_config(dir.path());
    DownloadCoordinator::prepare(&config).await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut coordinator = DownloadCoordinator::new(rx, &config);
    drop(tx);

    let result = coordinator.await_settlement(Duration::from_secs(1)).await;
    assert!(matches!(result, Err(DownloadError::Watch(_))));
}
