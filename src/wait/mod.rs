//! Completion Waiter
//!
//! Decides when the effect of a command has become visible on screen. A wait
//! either polls the pane at a fixed cadence or reacts to repaint
//! notifications; in both cases the current screen is checked first, and
//! running out of time is an ordinary `matched: false` outcome rather than an
//! error.
//!
//! ```ignore
//! use termpilot::wait::{wait_for, CompletionWait, ScreenPredicate, WaitStrategy};
//!
//! let wait = CompletionWait::new(ScreenPredicate::contains("DONE-42"))
//!     .with_timeout(Duration::from_secs(5))
//!     .with_poll_interval(Duration::from_millis(500))
//!     .with_strategy(WaitStrategy::Polling);
//!
//! let outcome = wait_for(emulator.as_ref(), &session, &wait).await?;
//! if !outcome.matched {
//!     eprintln!("{}", outcome.last_snapshot.text());
//! }
//! ```

mod event_driven;
mod polling;
pub mod predicate;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::WaitConfig;
use crate::emulator::{Emulator, SessionId};
use crate::error::{Error, Result};
use crate::screen::ScreenSnapshot;

pub use predicate::ScreenPredicate;

/// Default time budget for a wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How a wait observes the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Read a snapshot every poll interval
    Polling,
    /// React to repaint notifications
    #[default]
    EventDriven,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStrategy::Polling => f.write_str("polling"),
            WaitStrategy::EventDriven => f.write_str("event-driven"),
        }
    }
}

/// A request to wait until a predicate holds
#[derive(Debug, Clone)]
pub struct CompletionWait {
    pub predicate: ScreenPredicate,
    pub timeout: Duration,
    /// Only used by [`WaitStrategy::Polling`]
    pub poll_interval: Duration,
    pub strategy: WaitStrategy,
}

impl CompletionWait {
    pub fn new(predicate: ScreenPredicate) -> Self {
        Self {
            predicate,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            strategy: WaitStrategy::default(),
        }
    }

    /// Use the timing and strategy from configuration
    pub fn from_config(predicate: ScreenPredicate, config: &WaitConfig) -> Self {
        Self {
            predicate,
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            strategy: config.strategy,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check that both durations are positive
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidWait {
                reason: "timeout must be greater than zero".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidWait {
                reason: "poll interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Upper bound on snapshot reads in polling mode
    ///
    /// One read per interval across the budget, plus the initial read of the
    /// current screen.
    pub fn max_polls(&self) -> u32 {
        let interval = self.poll_interval.as_nanos().max(1);
        let rounds = self.timeout.as_nanos().div_ceil(interval);
        u32::try_from(rounds.saturating_add(1)).unwrap_or(u32::MAX)
    }
}

/// Result of a wait
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Whether the predicate held before the budget ran out
    pub matched: bool,
    /// The snapshot that ended the wait (the matching one, or the last seen)
    pub last_snapshot: ScreenSnapshot,
    /// Number of snapshots the predicate was evaluated on
    pub evaluations: usize,
    pub elapsed: Duration,
}

/// Wait on `session` until `wait.predicate` holds or `wait.timeout` elapses
///
/// # Errors
/// `InvalidWait` for non-positive durations, `SessionUnavailable` if the pane
/// disappears, `DriverDisconnected` if the emulator goes away. A timeout is
/// not an error.
pub async fn wait_for(
    emulator: &dyn Emulator,
    session: &SessionId,
    wait: &CompletionWait,
) -> Result<WaitOutcome> {
    wait.validate()?;
    debug!(
        session = %session,
        strategy = %wait.strategy,
        timeout_ms = wait.timeout.as_millis() as u64,
        "Waiting until {}",
        wait.predicate
    );

    let outcome = match wait.strategy {
        WaitStrategy::Polling => polling::wait(emulator, session, wait).await?,
        WaitStrategy::EventDriven => event_driven::wait(emulator, session, wait).await?,
    };

    if outcome.matched {
        info!(
            session = %session,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Matched: {}",
            wait.predicate
        );
    } else {
        warn!(
            session = %session,
            evaluations = outcome.evaluations,
            "Timed out after {:?} waiting until {}",
            wait.timeout,
            wait.predicate
        );
    }
    Ok(outcome)
}
