//! Polling strategy: read the screen at a fixed cadence

use tokio::time::{interval, Instant, MissedTickBehavior};

use super::{CompletionWait, WaitOutcome};
use crate::emulator::{Emulator, SessionId};
use crate::error::{Error, Result};
use crate::screen::ScreenSnapshot;

pub(super) async fn wait(
    emulator: &dyn Emulator,
    session: &SessionId,
    wait: &CompletionWait,
) -> Result<WaitOutcome> {
    let start = Instant::now();
    let deadline = start + wait.timeout;
    let max_polls = wait.max_polls();

    let mut ticker = interval(wait.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last: Option<ScreenSnapshot> = None;
    let mut last_error = None;
    let mut evaluations = 0;

    for poll in 1..=max_polls {
        // First tick fires immediately, so the current screen is checked before any wait
        ticker.tick().await;

        match emulator.get_snapshot(session).await {
            Ok(snapshot) => {
                evaluations += 1;
                let matched = wait.predicate.evaluate(&snapshot);
                if matched {
                    return Ok(WaitOutcome {
                        matched: true,
                        last_snapshot: snapshot,
                        evaluations,
                        elapsed: start.elapsed(),
                    });
                }
                last = Some(snapshot);
            }
            Err(err) if err.is_transient() => {
                debug!(session = %session, poll, "Snapshot read failed, retrying: {}", err);
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }

        if Instant::now() >= deadline {
            break;
        }
    }

    match last {
        Some(snapshot) => Ok(WaitOutcome {
            matched: false,
            last_snapshot: snapshot,
            evaluations,
            elapsed: start.elapsed(),
        }),
        // Every read failed; report why instead of inventing a blank screen
        None => Err(last_error.unwrap_or_else(|| Error::InvalidWait {
            reason: "no snapshot was read".to_string(),
        })),
    }
}
