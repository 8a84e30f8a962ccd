//! Behavioral tests for the quiescence detector.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};

use reportd::domain::ports::NetworkEvent;
use reportd::services::{QuiescenceDetector, QuiescenceOutcome};

#[tokio::test]
async fn settles_after_quiet_period_when_idle() {
    let (tx, rx) = broadcast::channel(16);
    let detector = QuiescenceDetector::new(rx);

    let started = Instant::now();
    let outcome = detector
        .await_quiescence(Duration::from_millis(50), Duration::from_secs(5), 0)
        .await;

    assert_eq!(outcome, QuiescenceOutcome::Settled);
    assert!(started.elapsed() >= Duration::from_millis(50));
    drop(tx);
}

#[tokio::test]
async fn traffic_restarts_the_quiet_window() {
    let (tx, rx) = broadcast::channel(16);
    let detector = QuiescenceDetector::new(rx);

    let sender = tx.clone();
    tokio::spawn(async move {
        sender.send(NetworkEvent::RequestStarted).unwrap();
        sleep(Duration::from_millis(100)).await;
        sender.send(NetworkEvent::RequestFinished).unwrap();
    });

    let started = Instant::now();
    let outcome = detector
        .await_quiescence(Duration::from_millis(80), Duration::from_secs(5), 0)
        .await;

    assert_eq!(outcome, QuiescenceOutcome::Settled);
    // the quiet window only starts once the request finishes
    assert!(started.elapsed() >= Duration::from_millis(180));
}

#[tokio::test]
async fn hard_timeout_bounds_the_wait() {
    let (tx, rx) = broadcast::channel(16);
    let detector = QuiescenceDetector::new(rx);

    tx.send(NetworkEvent::RequestStarted).unwrap();

    let started = Instant::now();
    let outcome = detector
        .await_quiescence(Duration::from_millis(50), Duration::from_millis(200), 0)
        .await;

    assert_eq!(outcome, QuiescenceOutcome::TimedOut);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
    drop(tx);
}

#[tokio::test]
async fn spurious_finish_events_are_ignored() {
    let (tx, rx) = broadcast::channel(16);
    let detector = QuiescenceDetector::new(rx);

    // finishes for requests this subscription never saw start
    tx.send(NetworkEvent::RequestFinished).unwrap();
    tx.send(NetworkEvent::RequestFailed).unwrap();

    let outcome = detector
        .await_quiescence(Duration::from_millis(50), Duration::from_secs(5), 0)
        .await;

    assert_eq!(outcome, QuiescenceOutcome::Settled);
    drop(tx);
}

#[tokio::test]
async fn tolerates_lingering_requests_up_to_threshold() {
    let (tx, rx) = broadcast::channel(16);
    let detector = QuiescenceDetector::new(rx);

    // one request stays in flight forever, but the threshold allows it
    tx.send(NetworkEvent::RequestStarted).unwrap();

    let outcome = detector
        .await_quiescence(Duration::from_millis(50), Duration::from_secs(5), 1)
        .await;

    assert_eq!(outcome, QuiescenceOutcome::Settled);
    drop(tx);
}

#[tokio::test]
async fn closed_stream_with_traffic_still_times_out() {
    let (tx, rx) = broadcast::channel(16);
    let detector = QuiescenceDetector::new(rx);

    tx.send(NetworkEvent::RequestStarted).unwrap();
    drop(tx);

    let started = Instant::now();
    let outcome = detector
        .await_quiescence(Duration::from_millis(50), Duration::from_millis(150), 0)
        .await;

    assert_eq!(outcome, QuiescenceOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(150));
}
