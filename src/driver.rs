//! High-level driver
//!
//! [`Driver`] bundles an emulator with configuration and offers the
//! operations automation scripts use: open tabs, type, wait for output, build
//! layouts, and tidy up afterwards.

use std::sync::Arc;

use crate::config::DriverConfig;
use crate::emulator::{Emulator, SessionId, TmuxEmulator};
use crate::error::Result;
use crate::keys::Key;
use crate::layout::{self, LayoutFile, LayoutMapping, PaneLayout};
use crate::screen::{self, RepaintSubscription, ScreenSnapshot};
use crate::session::{self, Acquired};
use crate::wait::{self, CompletionWait, ScreenPredicate, WaitOutcome};

/// Entry point for driving a terminal emulator
#[derive(Clone)]
pub struct Driver {
    emulator: Arc<dyn Emulator>,
    config: DriverConfig,
}

impl Driver {
    pub fn new(emulator: Arc<dyn Emulator>, config: DriverConfig) -> Self {
        Self { emulator, config }
    }

    /// Driver for the tmux server described by `config.tmux`
    pub fn tmux(config: DriverConfig) -> Self {
        let emulator = Arc::new(TmuxEmulator::new(config.tmux.clone()));
        Self::new(emulator, config)
    }

    pub fn emulator(&self) -> &dyn Emulator {
        self.emulator.as_ref()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Open a new tab next to `parent`
    pub async fn open_tab(&self, parent: &SessionId) -> Result<SessionId> {
        self.emulator.create_session(parent).await
    }

    pub async fn send_text(&self, session: &SessionId, text: &str) -> Result<()> {
        self.emulator.send_text(session, text).await
    }

    /// Type `line` followed by a newline
    pub async fn send_line(&self, session: &SessionId, line: &str) -> Result<()> {
        let mut text = String::with_capacity(line.len() + 1);
        text.push_str(line);
        text.push('\n');
        self.emulator.send_text(session, &text).await
    }

    /// Press each key in order
    pub async fn send_keys(&self, session: &SessionId, keys: &[Key]) -> Result<()> {
        let text = keys.iter().map(|key| key.encode()).collect::<Result<String>>()?;
        self.emulator.send_text(session, &text).await
    }

    pub async fn snapshot(&self, session: &SessionId) -> Result<ScreenSnapshot> {
        screen::snapshot(self.emulator(), session).await
    }

    pub async fn subscribe(&self, session: &SessionId) -> Result<RepaintSubscription> {
        screen::subscribe(self.emulator(), session).await
    }

    /// A wait on `predicate` with the configured timing and strategy
    pub fn completion_wait(&self, predicate: ScreenPredicate) -> CompletionWait {
        CompletionWait::from_config(predicate, &self.config.wait)
    }

    /// Wait for `predicate` using the configured defaults
    pub async fn wait_for(
        &self,
        session: &SessionId,
        predicate: ScreenPredicate,
    ) -> Result<WaitOutcome> {
        let wait = self.completion_wait(predicate);
        wait::wait_for(self.emulator(), session, &wait).await
    }

    pub async fn wait_with(&self, session: &SessionId, wait: &CompletionWait) -> Result<WaitOutcome> {
        wait::wait_for(self.emulator(), session, wait).await
    }

    /// Type `command` and wait until `predicate` holds
    ///
    /// The typed command line is itself on screen, so the predicate should
    /// look for something only the command's output produces.
    pub async fn run_and_wait(
        &self,
        session: &SessionId,
        command: &str,
        wait: &CompletionWait,
    ) -> Result<WaitOutcome> {
        self.send_line(session, command).await?;
        wait::wait_for(self.emulator(), session, wait).await
    }

    pub async fn realize(&self, root: &SessionId, layout: &PaneLayout) -> Result<LayoutMapping> {
        layout::realize(self.emulator(), root, layout).await
    }

    /// Realize a layout, then type each leaf's startup command into its pane
    pub async fn launch_layout(&self, root: &SessionId, file: &LayoutFile) -> Result<LayoutMapping> {
        let mapping = self.realize(root, &file.layout).await?;

        for (label, command) in file.layout.commands() {
            if let Some(session) = mapping.get(label) {
                debug!(label, session = %session, "Starting pane command");
                self.send_line(session, command).await?;
            }
        }

        info!(
            layout = file.name.as_deref().unwrap_or("unnamed"),
            panes = mapping.len(),
            "Layout launched"
        );
        Ok(mapping)
    }

    /// Hand the next `count` repaints of `session` to `on_frame`
    ///
    /// Returns how many frames were delivered; fewer than `count` means the
    /// subscription ended early.
    pub async fn watch<F>(&self, session: &SessionId, count: usize, mut on_frame: F) -> Result<usize>
    where
        F: FnMut(&ScreenSnapshot),
    {
        let mut subscription = self.subscribe(session).await?;
        let mut delivered = 0;

        while delivered < count {
            match subscription.next().await? {
                Some(snapshot) => {
                    on_frame(&snapshot);
                    delivered += 1;
                }
                None => break,
            }
        }

        subscription.cancel();
        Ok(delivered)
    }

    /// Find the pane called `name` or open a tab with that name, then bring
    /// it to the front
    pub async fn get_or_create(&self, parent: &SessionId, name: &str) -> Result<Acquired> {
        let acquired = session::get_or_create(self.emulator(), parent, name).await?;
        self.emulator.activate_session(acquired.session()).await?;
        Ok(acquired)
    }

    /// Close every other tab in `anchor`'s window, keeping the first and
    /// `anchor`'s own
    pub async fn cleanup(&self, anchor: &SessionId) -> Result<usize> {
        session::close_extra_tabs(self.emulator(), anchor, session::CLOSE_PAUSE).await
    }

    pub async fn close(&self, session: &SessionId) -> Result<()> {
        self.emulator.close_session(session).await
    }
}
