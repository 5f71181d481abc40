//! Screen observation: on-demand snapshots and repaint subscriptions

pub mod observer;
pub mod snapshot;

pub use observer::{
    FeedState, RepaintFeed, RepaintPublisher, RepaintSubscription, SubscriptionCanceller,
};
pub use snapshot::{GenerationCounter, ScreenSnapshot};

use crate::emulator::{Emulator, SessionId};
use crate::error::Result;

/// Read the current screen of `session`
pub async fn snapshot(emulator: &dyn Emulator, session: &SessionId) -> Result<ScreenSnapshot> {
    let snapshot = emulator.get_snapshot(session).await?;
    trace!(
        session = %session,
        generation = snapshot.generation(),
        lines = snapshot.line_count(),
        "Captured snapshot"
    );
    Ok(snapshot)
}

/// Open a repaint subscription on `session`
pub async fn subscribe(emulator: &dyn Emulator, session: &SessionId) -> Result<RepaintSubscription> {
    let feed = emulator.subscribe_to_repaints(session).await?;
    Ok(RepaintSubscription::new(feed))
}
