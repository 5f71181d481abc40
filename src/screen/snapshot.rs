//! Screen Snapshots
//!
//! An immutable, already-rendered view of a pane's visible lines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// The rendered text of a pane at one instant
///
/// Cloning is cheap; the lines are shared.
#[derive(Debug, Clone)]
pub struct ScreenSnapshot {
    lines: Arc<[String]>,
    generation: u64,
    captured_at: DateTime<Utc>,
}

impl ScreenSnapshot {
    /// Create a snapshot from rendered lines
    pub fn new(lines: Vec<String>, generation: u64) -> Self {
        Self {
            lines: lines.into(),
            generation,
            captured_at: Utc::now(),
        }
    }

    /// Create a snapshot from newline-separated screen text
    ///
    /// A single trailing newline is treated as a line terminator, not as an
    /// extra blank line.
    pub fn from_text(text: &str, generation: u64) -> Self {
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = if body.is_empty() && text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect()
        };
        Self::new(lines, generation)
    }

    /// Number of lines on screen
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of the line at `index`
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Lines that contain anything besides whitespace, with their index
    pub fn non_empty_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
    }

    /// Monotonic per-emulator ordering; larger is newer
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Whether any single line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().any(|line| line.contains(needle))
    }

    /// Whether the screen holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.non_empty_lines().next().is_none()
    }

    /// Whether two snapshots show the same text, regardless of generation
    pub fn same_content(&self, other: &ScreenSnapshot) -> bool {
        self.lines == other.lines
    }

    /// Screen text joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Hands out strictly increasing snapshot generations
#[derive(Debug)]
pub struct GenerationCounter {
    next: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}
