//! Split planning
//!
//! Flattens a [`PaneLayout`] into the ordered steps that realize it. Panes are
//! referred to by slot: slot 0 is the root pane, and each split creates the
//! next slot. The walk is depth-first; a split is issued before either of its
//! subtrees is visited, the first subtree keeps the pane that was split and
//! the second subtree starts in the new pane. Splitting inside one subtree
//! therefore never touches a pane already handed to its sibling.

use std::fmt;

use serde::Serialize;

use super::PaneLayout;
use crate::emulator::Orientation;
use crate::error::Result;

/// One emulator operation of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayoutStep {
    /// Split the pane in `target`, storing the new pane in `creates`
    Split {
        target: usize,
        orientation: Orientation,
        creates: usize,
    },
    /// Name the pane in `slot`
    Label { slot: usize, label: String },
}

impl fmt::Display for LayoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutStep::Split {
                target,
                orientation,
                creates,
            } => write!(f, "split pane #{} {} -> pane #{}", target, orientation, creates),
            LayoutStep::Label { slot, label } => write!(f, "label pane #{} {:?}", slot, label),
        }
    }
}

/// The ordered operations that realize a layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    steps: Vec<LayoutStep>,
    slot_count: usize,
}

impl LayoutPlan {
    /// Validate `layout` and compute its plan
    ///
    /// # Errors
    /// `DuplicateLabel` or `EmptyLabel`; nothing has touched the emulator yet.
    pub fn for_layout(layout: &PaneLayout) -> Result<Self> {
        layout.validate()?;

        let mut plan = LayoutPlan {
            steps: Vec::new(),
            slot_count: 1,
        };
        plan.visit(layout, 0);
        Ok(plan)
    }

    fn visit(&mut self, node: &PaneLayout, slot: usize) {
        match node {
            PaneLayout::Leaf { label, .. } => {
                self.steps.push(LayoutStep::Label {
                    slot,
                    label: label.clone(),
                });
            }
            PaneLayout::Split {
                orientation,
                first,
                second,
            } => {
                let creates = self.slot_count;
                self.slot_count += 1;
                self.steps.push(LayoutStep::Split {
                    target: slot,
                    orientation: *orientation,
                    creates,
                });
                self.visit(first, slot);
                self.visit(second, creates);
            }
        }
    }

    pub fn steps(&self) -> &[LayoutStep] {
        &self.steps
    }

    /// Number of panes the layout ends up with, root included
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn split_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, LayoutStep::Split { .. }))
            .count()
    }

    /// Number of splits between the root pane and each slot
    pub fn split_depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.slot_count];
        for step in &self.steps {
            if let LayoutStep::Split { target, creates, .. } = step {
                depths[*creates] = depths[*target] + 1;
            }
        }
        depths
    }
}
