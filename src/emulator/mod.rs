//! Terminal Emulator Abstraction
//!
//! The driver never talks to a terminal directly. Everything it needs from the
//! emulator's remote-control interface goes through the [`Emulator`] trait, so
//! the waiting and layout logic can run against tmux or against an in-memory
//! mock in tests.

pub mod tmux;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::screen::{RepaintFeed, ScreenSnapshot};

pub use tmux::TmuxEmulator;

/// Opaque handle to one pane, owned by the emulator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Direction of a split
///
/// `Vertical` places the new pane beside the original (a vertical divider),
/// `Horizontal` stacks it below (a horizontal divider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    /// Whether the two children end up side by side
    pub fn is_side_by_side(self) -> bool {
        matches!(self, Orientation::Vertical)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Vertical => f.write_str("vertical"),
            Orientation::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// One row of the emulator's session listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Pane identity
    pub id: SessionId,
    /// Display name, if the emulator reports one
    pub name: Option<String>,
    /// Identity of the containing tab
    pub tab_id: String,
    /// Position of the containing tab in its window
    pub tab_index: usize,
    /// Identity of the containing window
    pub window_id: String,
    /// Whether this pane is the focused pane of its tab
    pub active: bool,
}

/// Remote-control capabilities the driver needs from a terminal emulator
///
/// Implementations own all session bookkeeping; callers only hold
/// [`SessionId`]s. Every method is a suspension point and must not block the
/// runtime.
#[async_trait]
pub trait Emulator: Send + Sync {
    /// Open a new tab next to `parent` and return its pane
    async fn create_session(&self, parent: &SessionId) -> Result<SessionId>;

    /// Split `session` and return the newly created sibling pane
    async fn split_session(&self, session: &SessionId, orientation: Orientation)
        -> Result<SessionId>;

    /// Write text to the pane as if typed
    ///
    /// # Errors
    /// Returns `SessionUnavailable` if the pane is gone or closing
    async fn send_text(&self, session: &SessionId, text: &str) -> Result<()>;

    /// Set the pane's display name
    async fn set_name(&self, session: &SessionId, label: &str) -> Result<()>;

    /// Read the currently rendered screen
    ///
    /// # Errors
    /// Returns `SessionUnavailable` if the pane is gone
    async fn get_snapshot(&self, session: &SessionId) -> Result<ScreenSnapshot>;

    /// Start delivering a snapshot each time the pane repaints
    async fn subscribe_to_repaints(&self, session: &SessionId) -> Result<RepaintFeed>;

    /// Close the pane
    async fn close_session(&self, session: &SessionId) -> Result<()>;

    /// List every pane the emulator knows about
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>>;

    /// Bring the pane (and its tab) to the front
    async fn activate_session(&self, session: &SessionId) -> Result<()>;
}
