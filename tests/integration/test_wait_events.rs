//! Integration Tests for Event-Driven Completion Waits
//!
//! Repaints are injected from a spawned task on a paused clock, racing the
//! wait's own timer.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use termpilot::error::Error;
use termpilot::wait::wait_for;
use termpilot::{Driver, DriverConfig, ScreenPredicate, SessionId};
use test_utils::{wait_events, Failure, MockEmulator};
use tokio::time::{sleep, Instant};

fn repaint_after(mock: &MockEmulator, pane: &SessionId, after_ms: u64, text: &'static str) {
    let mock = mock.clone();
    let pane = pane.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(after_ms)).await;
        mock.repaint(&pane, text);
    });
}

#[tokio::test(start_paused = true)]
async fn test_initial_match_without_repaint() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.set_screen(&pane, "$ ./serve\nReady");

    let start = Instant::now();
    let outcome = wait_for(&mock, &pane, &wait_events("Ready", 5000))
        .await
        .unwrap();

    assert!(outcome.matched);
    assert_eq!(outcome.evaluations, 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(mock.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_match_on_repaint() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.set_screen(&pane, "$ make");
    repaint_after(&mock, &pane, 300, "$ make\nbuilding");
    repaint_after(&mock, &pane, 800, "$ make\nbuilding\nDONE-42");

    let start = Instant::now();
    let outcome = wait_for(&mock, &pane, &wait_events("DONE-42", 5000))
        .await
        .unwrap();

    assert!(outcome.matched);
    assert_eq!(outcome.last_snapshot.line(2), Some("DONE-42"));
    assert_eq!(outcome.evaluations, 3);
    assert_eq!(start.elapsed(), Duration::from_millis(800));
    // Repaints are not read back through the snapshot accessor
    assert_eq!(mock.read_count(&pane), 1);
}

#[tokio::test(start_paused = true)]
async fn test_frame_older_than_initial_read_never_matches() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    // A repaint showing the marker was queued before the screen moved on
    mock.stale_frame_on_subscribe("DONE-42");
    mock.set_screen(&pane, "idle");

    let outcome = wait_for(&mock, &pane, &wait_events("DONE-42", 1000))
        .await
        .unwrap();

    assert!(!outcome.matched);
    assert_eq!(outcome.last_snapshot.text(), "idle");
    assert_eq!(outcome.evaluations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_subscription() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.set_screen(&pane, "idle");
    repaint_after(&mock, &pane, 500, "still idle");

    let start = Instant::now();
    let outcome = wait_for(&mock, &pane, &wait_events("DONE-42", 2000))
        .await
        .unwrap();

    assert!(!outcome.matched);
    assert_eq!(outcome.last_snapshot.text(), "still idle");
    assert_eq!(start.elapsed(), Duration::from_millis(2000));
    assert_eq!(mock.releases(), 1);
    assert_eq!(mock.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_consumer_sees_latest_frame() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.set_screen(&pane, "0%");

    let burst = mock.clone();
    let target = pane.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        for text in ["25%", "50%", "75%", "100% DONE-42"] {
            burst.repaint(&target, text);
        }
    });

    let outcome = wait_for(&mock, &pane, &wait_events("DONE-42", 1000))
        .await
        .unwrap();

    assert!(outcome.matched);
    // Initial read plus one coalesced frame
    assert_eq!(outcome.evaluations, 2);
}

#[tokio::test(start_paused = true)]
async fn test_pane_closed_mid_wait() {
    let mock = MockEmulator::new();
    let pane = mock.root();

    let closer = mock.clone();
    let target = pane.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(500)).await;
        closer.close_externally(&target);
    });

    let err = wait_for(&mock, &pane, &wait_events("DONE-42", 5000))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionUnavailable { .. }));
    assert_eq!(mock.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_mid_wait_is_fatal() {
    let mock = MockEmulator::new();
    let pane = mock.root();

    let dropper = mock.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(250)).await;
        dropper.disconnect();
    });

    let err = wait_for(&mock, &pane, &wait_events("DONE-42", 5000))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn test_failed_initial_read_waits_for_repaint() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.fail_next_reads(&[Failure::Rejected]);
    repaint_after(&mock, &pane, 200, "DONE-42");

    let outcome = wait_for(&mock, &pane, &wait_events("DONE-42", 1000))
        .await
        .unwrap();
    assert!(outcome.matched);
    assert_eq!(outcome.evaluations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_any_frame_reads_final_screen() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.set_screen(&pane, "idle");
    mock.fail_next_reads(&[Failure::Rejected]);

    let outcome = wait_for(&mock, &pane, &wait_events("DONE-42", 500))
        .await
        .unwrap();
    assert!(!outcome.matched);
    assert_eq!(outcome.last_snapshot.text(), "idle");
    assert_eq!(mock.read_count(&pane), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_and_wait_through_driver() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.respond_to(&pane, "10 + 10", "MARKER_RESULT: 20");

    let driver = Driver::new(Arc::new(mock.clone()), DriverConfig::default());
    let wait = driver.completion_wait(ScreenPredicate::contains("MARKER_RESULT: 20"));
    let outcome = driver
        .run_and_wait(&pane, "print('MARKER_RESULT:', 10 + 10)", &wait)
        .await
        .unwrap();

    assert!(outcome.matched);
    assert_eq!(
        mock.sent_text(&pane),
        vec!["print('MARKER_RESULT:', 10 + 10)\n".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_watch_hands_over_each_repaint() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    repaint_after(&mock, &pane, 100, "tick 1");
    repaint_after(&mock, &pane, 200, "tick 2");
    repaint_after(&mock, &pane, 300, "tick 3");

    let driver = Driver::new(Arc::new(mock.clone()), DriverConfig::default());
    let mut seen = Vec::new();
    let delivered = driver
        .watch(&pane, 2, |snapshot| seen.push(snapshot.text()))
        .await
        .unwrap();

    assert_eq!(delivered, 2);
    assert_eq!(seen, vec!["tick 1".to_string(), "tick 2".to_string()]);
    assert_eq!(mock.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_frame_ready_with_the_deadline_wins() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    mock.set_screen(&pane, "working");

    let wait = wait_events("DONE-42", 1000);
    let waiting = wait_for(&mock, &pane, &wait);
    tokio::pin!(waiting);

    // Subscribed, initial screen checked, now parked on frame or timer
    assert!(futures::poll!(waiting.as_mut()).is_pending());

    // Both become ready before the waiter runs again
    tokio::time::advance(Duration::from_millis(1000)).await;
    mock.repaint(&pane, "working\nDONE-42");

    let outcome = waiting.await.unwrap();
    assert!(outcome.matched);
    assert_eq!(outcome.last_snapshot.line(1), Some("DONE-42"));
    assert_eq!(outcome.evaluations, 2);
    assert_eq!(outcome.elapsed, Duration::from_millis(1000));
    assert_eq!(mock.releases(), 1);
    assert_eq!(mock.active_subscriptions(), 0);
}
