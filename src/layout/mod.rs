//! Layout Orchestrator
//!
//! Builds multi-pane arrangements by recursive splitting. A [`PaneLayout`]
//! describes the desired tree; [`LayoutPlan`] turns it into the exact,
//! ordered sequence of split and label operations; [`realize`] runs that plan
//! against an emulator.
//!
//! ```ignore
//! // Server | Worker
//! //        |-------
//! //        | Logs
//! let layout = PaneLayout::vertical(
//!     PaneLayout::leaf("Server"),
//!     PaneLayout::horizontal(PaneLayout::leaf("Worker"), PaneLayout::leaf("Logs")),
//! );
//! let panes = realize(emulator.as_ref(), &root, &layout).await?;
//! emulator.send_text(panes.get("Logs").unwrap(), "tail -f app.log\n").await?;
//! ```

pub mod file;
pub mod plan;
mod realize;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::emulator::{Orientation, SessionId};
use crate::error::{Error, Result};

pub use file::LayoutFile;
pub use plan::{LayoutPlan, LayoutStep};
pub use realize::{execute, realize};

/// Desired shape of a pane tree
///
/// In files a leaf is written `{ pane = "Logs", command = "tail -f log" }`
/// and a split `{ split = "vertical", first = ..., second = ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaneLayout {
    /// A terminal pane
    Leaf {
        #[serde(rename = "pane")]
        label: String,
        /// Text sent to the pane (followed by a newline) once the layout exists
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
    /// Two subtrees separated by a divider
    Split {
        #[serde(rename = "split")]
        orientation: Orientation,
        /// Left or top child; keeps the pane being split
        first: Box<PaneLayout>,
        /// Right or bottom child; starts in the newly created pane
        second: Box<PaneLayout>,
    },
}

impl PaneLayout {
    pub fn leaf(label: impl Into<String>) -> Self {
        PaneLayout::Leaf {
            label: label.into(),
            command: None,
        }
    }

    pub fn leaf_with_command(label: impl Into<String>, command: impl Into<String>) -> Self {
        PaneLayout::Leaf {
            label: label.into(),
            command: Some(command.into()),
        }
    }

    pub fn split(orientation: Orientation, first: PaneLayout, second: PaneLayout) -> Self {
        PaneLayout::Split {
            orientation,
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// `first` on the left, `second` on the right
    pub fn vertical(first: PaneLayout, second: PaneLayout) -> Self {
        Self::split(Orientation::Vertical, first, second)
    }

    /// `first` on top, `second` below
    pub fn horizontal(first: PaneLayout, second: PaneLayout) -> Self {
        Self::split(Orientation::Horizontal, first, second)
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            PaneLayout::Leaf { .. } => 1,
            PaneLayout::Split { first, second, .. } => first.leaf_count() + second.leaf_count(),
        }
    }

    /// Leaf labels in visit order (first subtree before second)
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = Vec::with_capacity(self.leaf_count());
        self.collect_labels(&mut labels);
        labels
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PaneLayout::Leaf { label, .. } => out.push(label),
            PaneLayout::Split { first, second, .. } => {
                first.collect_labels(out);
                second.collect_labels(out);
            }
        }
    }

    /// Startup commands by label, in visit order
    pub fn commands(&self) -> Vec<(&str, &str)> {
        let mut commands = Vec::new();
        self.collect_commands(&mut commands);
        commands
    }

    fn collect_commands<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            PaneLayout::Leaf {
                label,
                command: Some(command),
            } => out.push((label, command)),
            PaneLayout::Leaf { command: None, .. } => {}
            PaneLayout::Split { first, second, .. } => {
                first.collect_commands(out);
                second.collect_commands(out);
            }
        }
    }

    /// Reject empty or repeated labels
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for label in self.labels() {
            if label.trim().is_empty() {
                return Err(Error::EmptyLabel);
            }
            if !seen.insert(label) {
                return Err(Error::DuplicateLabel {
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One realized pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedPane {
    pub label: String,
    pub session: SessionId,
    /// Number of splits on the path from the root pane to this one
    pub split_depth: usize,
}

/// Label to session mapping produced by [`realize`], in visit order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutMapping {
    panes: Vec<PlacedPane>,
}

impl LayoutMapping {
    pub fn get(&self, label: &str) -> Option<&SessionId> {
        self.placed(label).map(|pane| &pane.session)
    }

    pub fn placed(&self, label: &str) -> Option<&PlacedPane> {
        self.panes.iter().find(|pane| pane.label == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.placed(label).is_some()
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedPane> {
        self.panes.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.panes.iter().map(|pane| pane.label.as_str())
    }

    pub(crate) fn insert(&mut self, pane: PlacedPane) {
        self.panes.push(pane);
    }
}

impl<'a> IntoIterator for &'a LayoutMapping {
    type Item = &'a PlacedPane;
    type IntoIter = std::slice::Iter<'a, PlacedPane>;

    fn into_iter(self) -> Self::IntoIter {
        self.panes.iter()
    }
}
