//! tmux backend
//!
//! Drives a tmux server through its command line. Tabs are tmux windows,
//! sessions are panes (addressed by `%N` pane ids) and labels are pane
//! titles. tmux has no repaint callback, so repaint feeds are produced by a
//! background task that re-captures the pane and publishes whenever the
//! visible content changes.

use std::io;
use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{self, MissedTickBehavior};

use super::{Emulator, Orientation, SessionId, SessionInfo};
use crate::config::TmuxConfig;
use crate::error::{Error, Result};
use crate::screen::{GenerationCounter, RepaintFeed, RepaintPublisher, ScreenSnapshot};

/// Environment variable tmux sets to the pane a shell runs in
pub const PANE_ENV: &str = "TMUX_PANE";

const PANE_ID_FORMAT: &str = "#{pane_id}";
const LIST_FORMAT: &str =
    "#{pane_id}\t#{window_id}\t#{window_index}\t#{session_id}\t#{pane_active}\t#{pane_title}";

/// [`Emulator`] backed by a tmux server
pub struct TmuxEmulator {
    client: TmuxClient,
}

impl TmuxEmulator {
    pub fn new(config: TmuxConfig) -> Self {
        Self {
            client: TmuxClient {
                config: Arc::new(config),
                generations: Arc::new(GenerationCounter::new()),
            },
        }
    }

    /// The pane the current process runs in, if it runs inside tmux
    pub fn current_pane() -> Option<SessionId> {
        std::env::var(PANE_ENV)
            .ok()
            .filter(|pane| !pane.is_empty())
            .map(SessionId::new)
    }

    pub fn config(&self) -> &TmuxConfig {
        &self.client.config
    }
}

impl Default for TmuxEmulator {
    fn default() -> Self {
        Self::new(TmuxConfig::default())
    }
}

/// Cheap handle shared with repaint poller tasks
#[derive(Clone)]
struct TmuxClient {
    config: Arc<TmuxConfig>,
    generations: Arc<GenerationCounter>,
}

impl TmuxClient {
    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.config.binary);
        if let Some(socket) = &self.config.socket {
            command.arg("-L").arg(socket);
        }
        command.args(args).kill_on_drop(true);
        command
    }

    /// Run one tmux command and return its raw stdout
    async fn run_bytes(&self, args: &[&str], target: Option<&SessionId>) -> Result<Vec<u8>> {
        let name = args.first().copied().unwrap_or("tmux");
        trace!(command = name, ?target, "tmux");

        let output = self
            .command(args)
            .output()
            .await
            .map_err(|e| spawn_failure(&self.config, e))?;

        check_output(name, target, output)
    }

    /// Run one tmux command whose stdout must be UTF-8 (ids, listings)
    async fn run(&self, args: &[&str], target: Option<&SessionId>) -> Result<String> {
        let stdout = self.run_bytes(args, target).await?;
        decode_strict(args.first().copied().unwrap_or("tmux"), stdout)
    }

    async fn capture(&self, session: &SessionId) -> Result<ScreenSnapshot> {
        // Taken before the command runs so overlapping captures stay ordered
        let generation = self.generations.next();
        let stdout = self
            .run_bytes(&["capture-pane", "-p", "-t", session.as_str()], Some(session))
            .await?;
        Ok(screen_from_capture(&stdout, generation))
    }

    /// Publish the pane's content whenever it changes, until the feed is
    /// released or the pane or server goes away
    async fn watch_pane(self, publisher: RepaintPublisher, mut last: ScreenSnapshot) {
        let session = publisher.session().clone();
        let mut ticker = time::interval(self.config.repaint_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = publisher.closed() => break,
                _ = ticker.tick() => {}
            }

            match self.capture(&session).await {
                Ok(snapshot) => {
                    if snapshot.same_content(&last) {
                        continue;
                    }
                    last = snapshot.clone();
                    if !publisher.publish(snapshot) {
                        break;
                    }
                }
                Err(Error::SessionUnavailable { .. }) => {
                    publisher.session_closed();
                    break;
                }
                Err(Error::DriverDisconnected { reason }) => {
                    publisher.disconnected(reason);
                    break;
                }
                Err(e) => debug!(session = %session, "Repaint capture failed: {}", e),
            }
        }

        debug!(session = %session, "Repaint poller stopped");
    }
}

#[async_trait]
impl Emulator for TmuxEmulator {
    async fn create_session(&self, parent: &SessionId) -> Result<SessionId> {
        let out = self
            .client
            .run(
                &["new-window", "-a", "-t", parent.as_str(), "-P", "-F", PANE_ID_FORMAT],
                Some(parent),
            )
            .await?;
        let created = parse_pane_id("new-window", &out)?;
        info!(parent = %parent, session = %created, "Opened tab");
        Ok(created)
    }

    async fn split_session(
        &self,
        session: &SessionId,
        orientation: Orientation,
    ) -> Result<SessionId> {
        // tmux names splits by the direction panes are laid out in, not by
        // the divider
        let flag = if orientation.is_side_by_side() { "-h" } else { "-v" };
        let out = self
            .client
            .run(
                &["split-window", flag, "-t", session.as_str(), "-P", "-F", PANE_ID_FORMAT],
                Some(session),
            )
            .await?;
        parse_pane_id("split-window", &out)
    }

    async fn send_text(&self, session: &SessionId, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.client
            .run(&["send-keys", "-t", session.as_str(), "-l", "--", text], Some(session))
            .await
            .map(|_| ())
    }

    async fn set_name(&self, session: &SessionId, label: &str) -> Result<()> {
        self.client
            .run(&["select-pane", "-t", session.as_str(), "-T", label], Some(session))
            .await
            .map(|_| ())
    }

    async fn get_snapshot(&self, session: &SessionId) -> Result<ScreenSnapshot> {
        self.client.capture(session).await
    }

    async fn subscribe_to_repaints(&self, session: &SessionId) -> Result<RepaintFeed> {
        // Fails fast on a dead pane and gives the poller its baseline
        let baseline = self.client.capture(session).await?;
        let (publisher, feed) = RepaintFeed::channel(session.clone());

        let task = tokio::spawn(self.client.clone().watch_pane(publisher, baseline));
        debug!(session = %session, "Started repaint poller");

        Ok(feed.on_release(move || task.abort()))
    }

    async fn close_session(&self, session: &SessionId) -> Result<()> {
        self.client
            .run(&["kill-pane", "-t", session.as_str()], Some(session))
            .await?;
        debug!(session = %session, "Closed pane");
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let out = self
            .client
            .run(&["list-panes", "-a", "-F", LIST_FORMAT], None)
            .await?;
        out.lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_session_line)
            .collect()
    }

    async fn activate_session(&self, session: &SessionId) -> Result<()> {
        self.client
            .run(&["select-window", "-t", session.as_str()], Some(session))
            .await?;
        self.client
            .run(&["select-pane", "-t", session.as_str()], Some(session))
            .await
            .map(|_| ())
    }
}

fn spawn_failure(config: &TmuxConfig, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::DriverDisconnected {
            reason: format!("tmux binary '{}' not found", config.binary.display()),
        }
    } else {
        Error::Io(err)
    }
}

fn check_output(command: &str, target: Option<&SessionId>, output: Output) -> Result<Vec<u8>> {
    if output.status.success() {
        return Ok(output.stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(classify_failure(command, target, &stderr))
}

fn decode_strict(command: &str, stdout: Vec<u8>) -> Result<String> {
    String::from_utf8(stdout).map_err(|e| Error::UnexpectedResponse {
        command: command.to_string(),
        output: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Screen content is whatever the pane shows; invalid UTF-8 is replaced, not rejected
fn screen_from_capture(stdout: &[u8], generation: u64) -> ScreenSnapshot {
    ScreenSnapshot::from_text(&String::from_utf8_lossy(stdout), generation)
}

/// Map a failed tmux command to the driver's error kinds
fn classify_failure(command: &str, target: Option<&SessionId>, stderr: &str) -> Error {
    let reason = stderr.trim();

    if ["no server running", "error connecting to", "lost server", "server exited"]
        .iter()
        .any(|needle| reason.contains(needle))
    {
        return Error::DriverDisconnected {
            reason: reason.to_string(),
        };
    }

    let missing_target = ["can't find pane", "can't find window", "can't find session"]
        .iter()
        .any(|needle| reason.contains(needle));
    match target {
        Some(session) if missing_target => Error::SessionUnavailable {
            session: session.clone(),
        },
        _ => Error::CommandFailed {
            command: command.to_string(),
            reason: reason.to_string(),
        },
    }
}

/// Parse the `%N` pane id printed by `-P -F '#{pane_id}'`
fn parse_pane_id(command: &str, output: &str) -> Result<SessionId> {
    let id = output.trim();
    let valid = id
        .strip_prefix('%')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if valid {
        Ok(SessionId::new(id))
    } else {
        Err(Error::UnexpectedResponse {
            command: command.to_string(),
            output: output.to_string(),
        })
    }
}

fn parse_session_line(line: &str) -> Result<SessionInfo> {
    let unexpected = || Error::UnexpectedResponse {
        command: "list-panes".to_string(),
        output: line.to_string(),
    };

    let fields: Vec<&str> = line.splitn(6, '\t').collect();
    let [pane, window, index, session, active, title] = fields[..] else {
        return Err(unexpected());
    };

    Ok(SessionInfo {
        id: parse_pane_id("list-panes", pane)?,
        name: Some(title.to_string()).filter(|t| !t.is_empty()),
        tab_id: window.to_string(),
        tab_index: index.parse().map_err(|_| unexpected())?,
        window_id: session.to_string(),
        active: active == "1",
    })
}
