//! Session bookkeeping on top of the emulator's listing: reuse a pane by
//! name, group panes into tabs and close surplus tabs.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::emulator::{Emulator, SessionId, SessionInfo};
use crate::error::{Error, Result};

/// Pause between tab closures during cleanup
pub const CLOSE_PAUSE: Duration = Duration::from_millis(100);

/// Outcome of [`get_or_create`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "session", rename_all = "snake_case")]
pub enum Acquired {
    /// A pane with the requested name already existed
    Existing(SessionId),
    /// A new tab was opened and named
    Created(SessionId),
}

impl Acquired {
    pub fn session(&self) -> &SessionId {
        match self {
            Acquired::Existing(session) | Acquired::Created(session) => session,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Acquired::Created(_))
    }
}

/// One tab and the panes inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tab {
    pub id: String,
    pub index: usize,
    pub window_id: String,
    pub panes: Vec<SessionInfo>,
}

/// First pane in `sessions` whose name is exactly `name`
pub fn find_named<'a>(sessions: &'a [SessionInfo], name: &str) -> Option<&'a SessionInfo> {
    sessions
        .iter()
        .find(|info| info.name.as_deref() == Some(name))
}

/// Look `name` up in the emulator's current listing
pub async fn find_by_name(emulator: &dyn Emulator, name: &str) -> Result<Option<SessionInfo>> {
    let sessions = emulator.list_sessions().await?;
    Ok(find_named(&sessions, name).cloned())
}

/// Reuse the pane called `name`, or open a tab next to `parent` and give it
/// that name
pub async fn get_or_create(
    emulator: &dyn Emulator,
    parent: &SessionId,
    name: &str,
) -> Result<Acquired> {
    if name.trim().is_empty() {
        return Err(Error::EmptyLabel);
    }

    if let Some(existing) = find_by_name(emulator, name).await? {
        debug!(name, session = %existing.id, "Reusing session");
        return Ok(Acquired::Existing(existing.id));
    }

    let created = emulator.create_session(parent).await?;
    emulator.set_name(&created, name).await?;
    info!(name, session = %created, "Created session");
    Ok(Acquired::Created(created))
}

/// Group panes by tab, ordered by window and then tab index
pub fn group_by_tab(sessions: &[SessionInfo]) -> Vec<Tab> {
    let mut tabs: BTreeMap<(String, usize, String), Vec<SessionInfo>> = BTreeMap::new();
    for info in sessions {
        tabs.entry((info.window_id.clone(), info.tab_index, info.tab_id.clone()))
            .or_default()
            .push(info.clone());
    }

    tabs.into_iter()
        .map(|((window_id, index, id), panes)| Tab {
            id,
            index,
            window_id,
            panes,
        })
        .collect()
}

/// Close every tab in `anchor`'s window except the first one and the one
/// holding `anchor`, highest index first
///
/// Returns the number of tabs closed. Panes that disappear on their own while
/// this runs are skipped.
pub async fn close_extra_tabs(
    emulator: &dyn Emulator,
    anchor: &SessionId,
    pause: Duration,
) -> Result<usize> {
    let sessions = emulator.list_sessions().await?;
    let window = sessions
        .iter()
        .find(|info| &info.id == anchor)
        .map(|info| info.window_id.clone())
        .ok_or_else(|| Error::SessionUnavailable {
            session: anchor.clone(),
        })?;

    let tabs: Vec<Tab> = group_by_tab(&sessions)
        .into_iter()
        .filter(|tab| tab.window_id == window)
        .collect();

    let mut closed = 0;
    for (position, tab) in tabs.iter().enumerate().rev() {
        if position == 0 || tab.panes.iter().any(|pane| &pane.id == anchor) {
            continue;
        }
        if closed > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        for pane in &tab.panes {
            match emulator.close_session(&pane.id).await {
                Ok(()) | Err(Error::SessionUnavailable { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        debug!(tab = %tab.id, index = tab.index, "Closed tab");
        closed += 1;
    }

    info!(closed, window = %window, "Cleaned up tabs");
    Ok(closed)
}
