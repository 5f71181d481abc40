//! Special keys
//!
//! Named keys and their terminal byte sequences, so callers can write
//! `ctrl-x` or `up` instead of raw escape codes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// A non-printing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Tab,
    Backspace,
    Escape,
    Space,
    Delete,
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 to F12
    F(u8),
    /// Control plus an ASCII letter
    Ctrl(char),
}

static NAMES: Lazy<HashMap<&'static str, Key>> = Lazy::new(|| {
    HashMap::from([
        ("enter", Key::Enter),
        ("return", Key::Enter),
        ("cr", Key::Enter),
        ("tab", Key::Tab),
        ("backspace", Key::Backspace),
        ("bs", Key::Backspace),
        ("escape", Key::Escape),
        ("esc", Key::Escape),
        ("space", Key::Space),
        ("delete", Key::Delete),
        ("del", Key::Delete),
        ("up", Key::Up),
        ("down", Key::Down),
        ("right", Key::Right),
        ("left", Key::Left),
        ("home", Key::Home),
        ("end", Key::End),
        ("pageup", Key::PageUp),
        ("pgup", Key::PageUp),
        ("pagedown", Key::PageDown),
        ("pgdn", Key::PageDown),
    ])
});

impl Key {
    /// Parse a key name such as `enter`, `F5`, `ctrl-c` or `^x`
    pub fn parse(name: &str) -> Result<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let unknown = || Error::UnknownKey {
            name: name.to_string(),
        };

        if let Some(key) = NAMES.get(lower.as_str()) {
            return Ok(*key);
        }

        let ctrl = ["ctrl-", "ctrl+", "c-", "^"]
            .iter()
            .find_map(|prefix| lower.strip_prefix(prefix));
        if let Some(rest) = ctrl {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() => Ok(Key::Ctrl(c)),
                _ => Err(unknown()),
            };
        }

        if let Some(n) = lower.strip_prefix('f') {
            return match n.parse::<u8>() {
                Ok(n @ 1..=12) => Ok(Key::F(n)),
                _ => Err(unknown()),
            };
        }

        Err(unknown())
    }

    /// Bytes the terminal would receive for this key
    ///
    /// # Errors
    /// `UnknownKey` for a function key outside F1 to F12 or a control key
    /// that is not an ASCII letter; these have no terminal encoding.
    pub fn encode(self) -> Result<String> {
        let sequence = match self {
            Key::Enter => "\r".to_string(),
            Key::Tab => "\t".to_string(),
            Key::Backspace => "\x7f".to_string(),
            Key::Escape => "\x1b".to_string(),
            Key::Space => " ".to_string(),
            Key::Delete => "\x1b[3~".to_string(),
            Key::Up => "\x1b[A".to_string(),
            Key::Down => "\x1b[B".to_string(),
            Key::Right => "\x1b[C".to_string(),
            Key::Left => "\x1b[D".to_string(),
            Key::Home => "\x1b[H".to_string(),
            Key::End => "\x1b[F".to_string(),
            Key::PageUp => "\x1b[5~".to_string(),
            Key::PageDown => "\x1b[6~".to_string(),
            Key::F(n @ 1..=4) => format!("\x1bO{}", (b'P' + (n - 1)) as char),
            Key::F(n) => {
                let code = match n {
                    5 => 15,
                    6 => 17,
                    7 => 18,
                    8 => 19,
                    9 => 20,
                    10 => 21,
                    11 => 23,
                    12 => 24,
                    _ => return Err(self.unencodable()),
                };
                format!("\x1b[{}~", code)
            }
            Key::Ctrl(c) if c.is_ascii_alphabetic() => {
                char::from(c.to_ascii_lowercase() as u8 & 0x1f).to_string()
            }
            Key::Ctrl(_) => return Err(self.unencodable()),
        };
        Ok(sequence)
    }

    fn unencodable(self) -> Error {
        Error::UnknownKey {
            name: self.to_string(),
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::F(n) => write!(f, "f{}", n),
            Key::Ctrl(c) => write!(f, "ctrl-{}", c),
            other => {
                let name = NAMES
                    .iter()
                    .filter(|(_, key)| *key == other)
                    .map(|(name, _)| *name)
                    .max_by_key(|name| name.len())
                    .unwrap_or("?");
                f.write_str(name)
            }
        }
    }
}

/// Encode a sequence of key names into one string
pub fn encode_all<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<String> {
    names
        .into_iter()
        .map(|name| Key::parse(name).and_then(Key::encode))
        .collect()
}
