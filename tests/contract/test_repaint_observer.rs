//! Contract Tests for Repaint Subscriptions
//!
//! Every emulator backend hands out a `RepaintFeed`; these tests pin the
//! guarantees a consumer relies on regardless of the backend.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use termpilot::emulator::SessionId;
use termpilot::error::Error;
use termpilot::screen::{self, RepaintFeed, RepaintSubscription, ScreenSnapshot};
use test_utils::MockEmulator;

fn counted_feed(session: &str) -> (termpilot::RepaintPublisher, RepaintFeed, Arc<AtomicUsize>) {
    let released = Arc::new(AtomicUsize::new(0));
    let (publisher, feed) = RepaintFeed::channel(SessionId::new(session));
    let counter = Arc::clone(&released);
    let feed = feed.on_release(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (publisher, feed, released)
}

#[tokio::test]
async fn test_frames_arrive_in_generation_order() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    let mut subscription = screen::subscribe(&mock, &pane).await.unwrap();

    mock.repaint(&pane, "first");
    let first = subscription.next().await.unwrap().unwrap();
    mock.repaint(&pane, "second");
    let second = subscription.next().await.unwrap().unwrap();

    assert_eq!(first.text(), "first");
    assert_eq!(second.text(), "second");
    assert!(second.generation() > first.generation());
}

#[tokio::test]
async fn test_burst_collapses_to_latest() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    let mut subscription = screen::subscribe(&mock, &pane).await.unwrap();

    for n in 1..=10 {
        mock.repaint(&pane, &format!("line {}", n));
    }

    let snapshot = subscription.next().await.unwrap().unwrap();
    assert_eq!(snapshot.text(), "line 10");

    // Nothing older is delivered afterwards
    let pending = tokio::time::timeout(Duration::from_millis(20), subscription.next()).await;
    assert!(pending.is_err());
}

#[tokio::test]
async fn test_repeated_frame_is_not_redelivered() {
    let (publisher, feed, _) = counted_feed("%3");
    let mut subscription = RepaintSubscription::new(feed);

    publisher.publish(ScreenSnapshot::from_text("same", 7));
    assert!(subscription.next().await.unwrap().is_some());
    publisher.publish(ScreenSnapshot::from_text("same", 7));
    publisher.publish(ScreenSnapshot::from_text("older", 5));

    let pending = tokio::time::timeout(Duration::from_millis(20), subscription.next()).await;
    assert!(pending.is_err());
}

#[tokio::test]
async fn test_skip_through_hides_already_seen_frames() {
    let (publisher, feed, _) = counted_feed("%3");
    let mut subscription = RepaintSubscription::new(feed);

    publisher.publish(ScreenSnapshot::from_text("before read", 4));
    subscription.skip_through(10);
    let pending = tokio::time::timeout(Duration::from_millis(20), subscription.next()).await;
    assert!(pending.is_err());

    publisher.publish(ScreenSnapshot::from_text("after read", 11));
    let snapshot = subscription.next().await.unwrap().unwrap();
    assert_eq!(snapshot.text(), "after read");
}

#[tokio::test]
async fn test_cancel_is_idempotent_and_releases_once() {
    let (publisher, feed, released) = counted_feed("%1");
    let mut subscription = RepaintSubscription::new(feed);

    assert!(subscription.cancel());
    assert!(!subscription.cancel());
    assert!(subscription.is_cancelled());
    assert_eq!(released.load(Ordering::SeqCst), 1);

    // A cancelled subscription yields nothing, even with a frame pending
    publisher.publish(ScreenSnapshot::from_text("late", 1));
    assert!(subscription.next().await.unwrap().is_none());

    drop(subscription);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_drop_releases_the_emulator_resource() {
    let mock = MockEmulator::new();
    let pane = mock.root();

    let subscription = screen::subscribe(&mock, &pane).await.unwrap();
    assert_eq!(mock.active_subscriptions(), 1);
    drop(subscription);

    assert_eq!(mock.releases(), 1);
    assert_eq!(mock.active_subscriptions(), 0);
    // Publishing to a dropped feed is a no-op
    assert_eq!(mock.repaint(&pane, "nobody listens"), 0);
}

#[tokio::test]
async fn test_canceller_wakes_a_blocked_consumer() {
    let (_publisher, feed, released) = counted_feed("%1");
    let mut subscription = RepaintSubscription::new(feed);
    let canceller = subscription.canceller();

    let consumer = tokio::spawn(async move { subscription.next().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(canceller.cancel());

    let result = consumer.await.unwrap();
    assert!(matches!(result, Ok(None)));
    assert!(canceller.is_cancelled());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_closed_session_ends_with_error() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    let mut subscription = screen::subscribe(&mock, &pane).await.unwrap();

    mock.close_externally(&pane);

    let err = subscription.next().await.unwrap_err();
    assert!(matches!(err, Error::SessionUnavailable { ref session } if *session == pane));
    assert!(subscription.is_cancelled());
    assert_eq!(mock.releases(), 1);
}

#[tokio::test]
async fn test_dropped_publisher_is_a_disconnect() {
    let (publisher, feed, released) = counted_feed("%9");
    let mut subscription = RepaintSubscription::new(feed);
    drop(publisher);

    let err = subscription.next().await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stream_ends_on_cancel() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    let subscription = screen::subscribe(&mock, &pane).await.unwrap();
    let canceller = subscription.canceller();
    let mut frames = Box::pin(subscription.into_stream());

    mock.repaint(&pane, "one");
    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first.text(), "one");

    canceller.cancel();
    assert!(frames.next().await.is_none());
    assert_eq!(mock.releases(), 1);
}

#[tokio::test]
async fn test_independent_subscriptions_on_one_pane() {
    let mock = MockEmulator::new();
    let pane = mock.root();
    let mut a = screen::subscribe(&mock, &pane).await.unwrap();
    let mut b = screen::subscribe(&mock, &pane).await.unwrap();
    assert_ne!(a.id(), b.id());

    assert_eq!(mock.repaint(&pane, "shared"), 2);
    a.cancel();

    assert!(a.next().await.unwrap().is_none());
    assert_eq!(b.next().await.unwrap().unwrap().text(), "shared");
}
