//! Configuration for termpilot
//!
//! Wait timing, the tmux backend and logging. Configuration is read-only: it
//! is loaded from disk (see [`loader`]) or taken from defaults, never written
//! back.

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::wait::WaitStrategy;

pub use loader::ConfigLoader;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Default timing for completion waits
    pub wait: WaitConfig,

    /// tmux backend settings
    pub tmux: TmuxConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl DriverConfig {
    /// Check every field for sane values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait.timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("wait.timeout_ms"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("wait.poll_interval_ms"));
        }
        if self.wait.poll_interval_ms > self.wait.timeout_ms {
            return Err(ConfigError::IntervalExceedsTimeout {
                interval_ms: self.wait.poll_interval_ms,
                timeout_ms: self.wait.timeout_ms,
            });
        }
        if self.tmux.binary.as_os_str().is_empty() {
            return Err(ConfigError::EmptyBinary);
        }
        if self.tmux.repaint_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("tmux.repaint_interval_ms"));
        }
        if let Some(socket) = &self.tmux.socket {
            if socket.trim().is_empty() {
                return Err(ConfigError::EmptySocket);
            }
        }
        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::UnknownLogLevel(self.logging.level.clone()));
        }
        Ok(())
    }
}

/// Default timing for completion waits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Time budget for a wait in milliseconds
    pub timeout_ms: u64,

    /// Polling cadence in milliseconds
    pub poll_interval_ms: u64,

    /// Polling or event-driven
    pub strategy: WaitStrategy,
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            poll_interval_ms: 500,
            strategy: WaitStrategy::EventDriven,
        }
    }
}

/// tmux backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmuxConfig {
    /// tmux executable
    pub binary: PathBuf,

    /// Server socket name (`tmux -L`)
    pub socket: Option<String>,

    /// How often repaint feeds re-capture a pane, in milliseconds
    pub repaint_interval_ms: u64,
}

impl TmuxConfig {
    pub fn repaint_interval(&self) -> Duration {
        Duration::from_millis(self.repaint_interval_ms)
    }
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tmux"),
            socket: None,
            repaint_interval_ms: 50,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than 0")]
    ZeroDuration(&'static str),

    #[error("Poll interval {interval_ms}ms exceeds timeout {timeout_ms}ms")]
    IntervalExceedsTimeout { interval_ms: u64, timeout_ms: u64 },

    #[error("tmux binary cannot be empty")]
    EmptyBinary,

    #[error("tmux socket name cannot be empty")]
    EmptySocket,

    #[error("Unknown log level: {0}")]
    UnknownLogLevel(String),
}

impl ConfigError {
    /// Dotted path of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::ZeroDuration(field) => field,
            ConfigError::IntervalExceedsTimeout { .. } => "wait.poll_interval_ms",
            ConfigError::EmptyBinary => "tmux.binary",
            ConfigError::EmptySocket => "tmux.socket",
            ConfigError::UnknownLogLevel(_) => "logging.level",
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::ConfigValidationFailed {
            field: err.field().to_string(),
            reason: err.to_string(),
        }
    }
}
