//! Event-driven strategy: react to repaint notifications

use tokio::time::{sleep_until, Instant};

use super::{CompletionWait, WaitOutcome};
use crate::emulator::{Emulator, SessionId};
use crate::error::Result;
use crate::screen::{RepaintSubscription, ScreenSnapshot};

pub(super) async fn wait(
    emulator: &dyn Emulator,
    session: &SessionId,
    wait: &CompletionWait,
) -> Result<WaitOutcome> {
    let start = Instant::now();
    let deadline = start + wait.timeout;

    // Subscribe before reading the current screen so a repaint landing
    // between the two cannot be missed
    let mut subscription = RepaintSubscription::new(emulator.subscribe_to_repaints(session).await?);

    let mut evaluations = 0;
    let mut last: Option<ScreenSnapshot> = None;

    match emulator.get_snapshot(session).await {
        Ok(initial) => {
            evaluations += 1;
            subscription.skip_through(initial.generation());
            if wait.predicate.evaluate(&initial) {
                subscription.cancel();
                return Ok(WaitOutcome {
                    matched: true,
                    last_snapshot: initial,
                    evaluations,
                    elapsed: start.elapsed(),
                });
            }
            last = Some(initial);
        }
        Err(err) if err.is_transient() => {
            debug!(session = %session, "Initial snapshot failed, waiting for a repaint: {}", err);
        }
        Err(err) => return Err(err),
    }

    let timer = sleep_until(deadline);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            // A repaint ready on the same tick as the timer carries more information
            biased;
            next = subscription.next() => match next? {
                Some(snapshot) => {
                    evaluations += 1;
                    let matched = wait.predicate.evaluate(&snapshot);
                    if matched {
                        subscription.cancel();
                        return Ok(WaitOutcome {
                            matched: true,
                            last_snapshot: snapshot,
                            evaluations,
                            elapsed: start.elapsed(),
                        });
                    }
                    last = Some(snapshot);
                }
                // Cancelled from outside: give up like a timeout
                None => break,
            },
            _ = &mut timer => {
                subscription.cancel();
                break;
            }
        }
    }

    let last_snapshot = match last {
        Some(snapshot) => snapshot,
        None => emulator.get_snapshot(session).await?,
    };

    Ok(WaitOutcome {
        matched: false,
        last_snapshot,
        evaluations,
        elapsed: start.elapsed(),
    })
}
