//! termpilot - drive terminal panes the way a person at the keyboard would
//!
//! This library opens tabs, splits panes into layouts, types text and keys,
//! and waits until the effect of a command is visible on screen. It talks to
//! the terminal through a remote-control interface (tmux out of the box) and
//! never parses the pane's byte stream itself.
//!
//! ## Module Organization
//!
//! - [`emulator`] - The [`Emulator`] seam and the tmux backend
//! - [`screen`] - Snapshots of the visible screen and repaint subscriptions
//! - [`wait`] - Completion waits, polling or event-driven
//! - [`layout`] - Layout trees, split planning and realization
//! - [`session`] - Reuse panes by name, tab grouping, cleanup
//! - [`keys`] - Named special keys and their byte sequences
//! - [`driver`] - The [`Driver`] facade tying it all together
//! - [`config`] - Configuration loading and validation
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use termpilot::{Driver, DriverConfig, ScreenPredicate, SessionId};
//!
//! # async fn run() -> termpilot::Result<()> {
//! let driver = Driver::tmux(DriverConfig::default());
//! let pane = SessionId::new("%0");
//!
//! driver.send_line(&pane, "python3 -c 'print(\"MARKER_RESULT:\", 10 + 10)'").await?;
//! let outcome = driver
//!     .wait_for(&pane, ScreenPredicate::contains("MARKER_RESULT: 20"))
//!     .await?;
//! assert!(outcome.matched);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Every emulator call is an `async fn` on a tokio runtime. Repaint
//! notifications travel through a latest-wins channel, so a slow consumer
//! skips intermediate frames instead of queueing them. Waits and layouts on
//! different panes may run concurrently; operations on one pane are issued in
//! order by the caller.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod driver;
pub mod emulator;
pub mod error;
pub mod keys;
pub mod layout;
pub mod screen;
pub mod session;
pub mod wait;

pub use config::{ConfigLoader, DriverConfig};
pub use driver::Driver;
pub use emulator::{Emulator, Orientation, SessionId, SessionInfo, TmuxEmulator};
pub use error::{Error, Result};
pub use keys::Key;
pub use layout::{LayoutFile, LayoutMapping, LayoutPlan, PaneLayout};
pub use screen::{RepaintFeed, RepaintPublisher, RepaintSubscription, ScreenSnapshot};
pub use session::Acquired;
pub use wait::{wait_for, CompletionWait, ScreenPredicate, WaitOutcome, WaitStrategy};

/// The current version of termpilot from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");
