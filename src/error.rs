//! Error types and Result aliases for termpilot

use std::fmt;
use std::path::PathBuf;

use crate::emulator::SessionId;
use crate::layout::LayoutMapping;

/// Result type alias for termpilot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for termpilot
#[derive(Debug)]
pub enum Error {
    // === Emulator errors ===
    /// The session handle no longer refers to a live pane
    SessionUnavailable {
        session: SessionId,
    },

    /// Connection to the emulator was lost (or never established)
    DriverDisconnected {
        reason: String,
    },

    /// The emulator rejected a command
    CommandFailed {
        command: String,
        reason: String,
    },

    /// The emulator answered with output we could not understand
    UnexpectedResponse {
        command: String,
        output: String,
    },

    // === Layout errors ===
    /// Two leaves of a layout share a label
    DuplicateLabel {
        label: String,
    },

    /// A leaf has an empty label
    EmptyLabel,

    /// A split or label failed mid-orchestration
    LayoutPartiallyApplied {
        mapping: LayoutMapping,
        source: Box<Error>,
    },

    // === Wait errors ===
    /// Wait parameters are out of range
    InvalidWait {
        reason: String,
    },

    /// Unknown special key name
    UnknownKey {
        name: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    /// Generic errors
    Other(String),
}

impl Error {
    /// Whether a read that failed with this error may succeed if retried.
    ///
    /// Only plain I/O hiccups and rejected commands qualify. A missing
    /// session or a dead connection never heals by retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::CommandFailed { .. } | Error::UnexpectedResponse { .. }
        )
    }

    /// Whether this error means the emulator connection is gone
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DriverDisconnected { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Emulator errors
            Error::SessionUnavailable { session } => {
                write!(f, "Session '{}' is no longer available", session)
            }
            Error::DriverDisconnected { reason } => {
                write!(f, "Lost connection to the terminal emulator: {}", reason)
            }
            Error::CommandFailed { command, reason } => {
                write!(f, "Emulator command '{}' failed: {}", command, reason)
            }
            Error::UnexpectedResponse { command, output } => {
                write!(f, "Unexpected response to '{}': {:?}", command, output)
            }

            // Layout errors
            Error::DuplicateLabel { label } => {
                write!(f, "Layout label '{}' is used more than once", label)
            }
            Error::EmptyLabel => write!(f, "Layout labels cannot be empty"),
            Error::LayoutPartiallyApplied { mapping, source } => {
                write!(
                    f,
                    "Layout partially applied ({} pane(s) labeled): {}",
                    mapping.len(),
                    source
                )
            }

            // Wait errors
            Error::InvalidWait { reason } => write!(f, "Invalid wait: {}", reason),
            Error::UnknownKey { name } => write!(f, "Unknown key name: '{}'", name),

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::LayoutPartiallyApplied { source, .. } => Some(source.as_ref()),
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}
