//! Repaint Observer
//!
//! Emulators push a fresh [`ScreenSnapshot`] into a [`RepaintPublisher`] each
//! time a pane repaints. Consumers read them through a [`RepaintSubscription`].
//!
//! The channel between the two is a `tokio::sync::watch`, so it holds at most
//! the latest unread frame: a slow consumer skips intermediate frames but
//! always ends up seeing the newest one.
//!
//! ```ignore
//! let feed = emulator.subscribe_to_repaints(&session).await?;
//! let mut subscription = RepaintSubscription::new(feed);
//!
//! while let Some(snapshot) = subscription.next().await? {
//!     if snapshot.contains("Ready") {
//!         break;
//!     }
//! }
//! subscription.cancel();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, Stream};
use tokio::sync::watch;
use uuid::Uuid;

use super::snapshot::ScreenSnapshot;
use crate::emulator::SessionId;
use crate::error::{Error, Result};

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Latest state of a repaint feed
#[derive(Debug, Clone)]
pub enum FeedState {
    /// Nothing has been painted since the feed opened
    Pending,
    /// Most recent frame
    Frame(ScreenSnapshot),
    /// The pane went away
    SessionClosed,
    /// The emulator connection went away
    Disconnected(String),
}

/// Emulator-side end of a repaint feed
pub struct RepaintPublisher {
    session: SessionId,
    tx: watch::Sender<FeedState>,
}

impl RepaintPublisher {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Replace the unread frame with `snapshot`
    ///
    /// Returns `false` once the consumer is gone, which tells the emulator to
    /// stop producing frames.
    pub fn publish(&self, snapshot: ScreenSnapshot) -> bool {
        self.tx.send(FeedState::Frame(snapshot)).is_ok()
    }

    /// Report that the pane no longer exists
    pub fn session_closed(&self) {
        let _ = self.tx.send(FeedState::SessionClosed);
    }

    /// Report that the emulator connection is lost
    pub fn disconnected(&self, reason: impl Into<String>) {
        let _ = self.tx.send(FeedState::Disconnected(reason.into()));
    }

    /// Whether the consumer has dropped its end
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped its end
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Consumer-side end of a repaint feed, as handed out by an emulator
///
/// Carries the action that frees the emulator-side resource (a polling task,
/// a server-side notification registration, ...). Wrap it in a
/// [`RepaintSubscription`] to consume it.
pub struct RepaintFeed {
    session: SessionId,
    frames: watch::Receiver<FeedState>,
    release: Option<ReleaseFn>,
}

impl RepaintFeed {
    /// Create a connected publisher/feed pair for `session`
    pub fn channel(session: SessionId) -> (RepaintPublisher, RepaintFeed) {
        let (tx, rx) = watch::channel(FeedState::Pending);
        let publisher = RepaintPublisher {
            session: session.clone(),
            tx,
        };
        let feed = RepaintFeed {
            session,
            frames: rx,
            release: None,
        };
        (publisher, feed)
    }

    /// Run `release` exactly once when the subscription ends
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }
}

/// Shared release state of one subscription
struct ReleaseGuard {
    id: Uuid,
    session: SessionId,
    released: AtomicBool,
    action: Mutex<Option<ReleaseFn>>,
    cancel_tx: watch::Sender<bool>,
}

impl ReleaseGuard {
    /// Returns `true` only for the call that actually released
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }

        let action = match self.action.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(action) = action {
            action();
        }

        self.cancel_tx.send_replace(true);
        debug!(subscription = %self.id, session = %self.session, "Repaint subscription released");
        true
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Cancels a subscription from another task
#[derive(Clone)]
pub struct SubscriptionCanceller {
    guard: Arc<ReleaseGuard>,
}

impl SubscriptionCanceller {
    /// Cancel the subscription; returns `true` if this call released it
    pub fn cancel(&self) -> bool {
        self.guard.release()
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_released()
    }
}

/// An ordered, cancellable sequence of repaints for one session
///
/// Each call to [`next`](Self::next) yields a snapshot strictly newer than the
/// previous one. The emulator-side resource is released exactly once: on
/// [`cancel`](Self::cancel), on a terminal feed state, or on drop.
pub struct RepaintSubscription {
    session: SessionId,
    frames: watch::Receiver<FeedState>,
    cancel_rx: watch::Receiver<bool>,
    guard: Arc<ReleaseGuard>,
    last_generation: Option<u64>,
}

impl RepaintSubscription {
    pub fn new(feed: RepaintFeed) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let guard = Arc::new(ReleaseGuard {
            id: Uuid::new_v4(),
            session: feed.session.clone(),
            released: AtomicBool::new(false),
            action: Mutex::new(feed.release),
            cancel_tx,
        });
        debug!(subscription = %guard.id, session = %feed.session, "Repaint subscription opened");

        Self {
            session: feed.session,
            frames: feed.frames,
            cancel_rx,
            guard,
            last_generation: None,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn id(&self) -> Uuid {
        self.guard.id
    }

    /// Handle for cancelling from elsewhere
    pub fn canceller(&self) -> SubscriptionCanceller {
        SubscriptionCanceller {
            guard: Arc::clone(&self.guard),
        }
    }

    /// Cancel the subscription; cancelling again is a no-op
    ///
    /// Returns `true` if this call released the emulator-side resource.
    pub fn cancel(&self) -> bool {
        self.guard.release()
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_released()
    }

    /// Treat every frame up to and including `generation` as already seen
    pub fn skip_through(&mut self, generation: u64) {
        self.last_generation = Some(self.last_generation.map_or(generation, |g| g.max(generation)));
    }

    /// Wait for the next repaint
    ///
    /// Returns `Ok(None)` once the subscription is cancelled.
    ///
    /// # Errors
    /// `SessionUnavailable` if the pane closed, `DriverDisconnected` if the
    /// emulator went away. The subscription is released in both cases.
    pub async fn next(&mut self) -> Result<Option<ScreenSnapshot>> {
        loop {
            if self.guard.is_released() {
                return Ok(None);
            }

            let state = self.frames.borrow_and_update().clone();
            match state {
                FeedState::Pending => {}
                FeedState::Frame(snapshot) => {
                    let is_new = self
                        .last_generation
                        .map_or(true, |seen| snapshot.generation() > seen);
                    if is_new {
                        self.last_generation = Some(snapshot.generation());
                        return Ok(Some(snapshot));
                    }
                }
                FeedState::SessionClosed => {
                    self.guard.release();
                    return Err(Error::SessionUnavailable {
                        session: self.session.clone(),
                    });
                }
                FeedState::Disconnected(reason) => {
                    self.guard.release();
                    return Err(Error::DriverDisconnected { reason });
                }
            }

            tokio::select! {
                biased;
                changed = self.frames.changed() => {
                    if changed.is_err() {
                        self.guard.release();
                        return Err(Error::DriverDisconnected {
                            reason: format!("repaint source for '{}' went away", self.session),
                        });
                    }
                }
                _ = self.cancel_rx.changed() => {}
            }
        }
    }

    /// Consume the subscription as a stream that ends on cancellation
    pub fn into_stream(self) -> impl Stream<Item = Result<ScreenSnapshot>> + Send {
        stream::unfold(self, |mut subscription| async move {
            match subscription.next().await {
                Ok(Some(snapshot)) => Some((Ok(snapshot), subscription)),
                Ok(None) => None,
                Err(err) => Some((Err(err), subscription)),
            }
        })
    }
}

impl Drop for RepaintSubscription {
    fn drop(&mut self) {
        self.guard.release();
    }
}
