//! Property-based tests for layout planning and realization
//!
//! Random layout trees are planned and realized against the mock emulator.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::collections::HashSet;

use proptest::prelude::*;
use termpilot::emulator::Orientation;
use termpilot::layout::{realize, LayoutPlan, PaneLayout};
use test_utils::MockEmulator;

/// Tree shape without labels; leaves are numbered afterwards so labels stay unique
#[derive(Debug, Clone)]
enum Shape {
    Leaf,
    Split(Orientation, Box<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let orientation = prop_oneof![Just(Orientation::Vertical), Just(Orientation::Horizontal)];
    Just(Shape::Leaf).prop_recursive(5, 24, 2, move |inner| {
        (orientation.clone(), inner.clone(), inner)
            .prop_map(|(o, first, second)| Shape::Split(o, Box::new(first), Box::new(second)))
    })
}

fn build(shape: &Shape, next: &mut usize) -> PaneLayout {
    match shape {
        Shape::Leaf => {
            *next += 1;
            PaneLayout::leaf(format!("pane-{}", next))
        }
        Shape::Split(orientation, first, second) => {
            let first = build(first, next);
            let second = build(second, next);
            PaneLayout::split(*orientation, first, second)
        }
    }
}

fn layout_from(shape: &Shape) -> PaneLayout {
    let mut next = 0;
    build(shape, &mut next)
}

/// Expected split depth of every leaf: the first subtree keeps the split
/// pane, the second starts one split further from the root
fn expected_depths(layout: &PaneLayout, depth: usize, out: &mut Vec<(String, usize)>) {
    match layout {
        PaneLayout::Leaf { label, .. } => out.push((label.clone(), depth)),
        PaneLayout::Split { first, second, .. } => {
            expected_depths(first, depth, out);
            expected_depths(second, depth + 1, out);
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_plan_uses_one_split_per_extra_pane(shape in shape()) {
        let layout = layout_from(&shape);
        let plan = LayoutPlan::for_layout(&layout).unwrap();

        prop_assert_eq!(plan.slot_count(), layout.leaf_count());
        prop_assert_eq!(plan.split_count(), layout.leaf_count() - 1);
    }

    #[test]
    fn test_realized_panes_are_distinct(shape in shape()) {
        let layout = layout_from(&shape);
        let mock = MockEmulator::new();
        let root = mock.root();

        let mapping = runtime().block_on(realize(&mock, &root, &layout)).unwrap();

        prop_assert_eq!(mapping.len(), layout.leaf_count());
        let sessions: HashSet<_> = mapping.iter().map(|pane| pane.session.clone()).collect();
        prop_assert_eq!(sessions.len(), mapping.len());
        prop_assert_eq!(mock.split_calls().len(), layout.leaf_count() - 1);
        prop_assert_eq!(mock.open_panes(), layout.leaf_count());

        // The leftmost leaf keeps the root pane
        let first = mapping.iter().next().unwrap();
        prop_assert_eq!(&first.session, &root);
        prop_assert_eq!(first.split_depth, 0);
    }

    #[test]
    fn test_split_depth_follows_second_branches(shape in shape()) {
        let layout = layout_from(&shape);
        let mock = MockEmulator::new();
        let mapping = runtime()
            .block_on(realize(&mock, &mock.root(), &layout))
            .unwrap();

        let mut expected = Vec::new();
        expected_depths(&layout, 0, &mut expected);
        let actual: Vec<_> = mapping
            .iter()
            .map(|pane| (pane.label.clone(), pane.split_depth))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn test_every_split_targets_an_existing_pane(shape in shape()) {
        let layout = layout_from(&shape);
        let mock = MockEmulator::new();
        let root = mock.root();
        let mapping = runtime().block_on(realize(&mock, &root, &layout)).unwrap();

        let placed: HashSet<_> = mapping.iter().map(|pane| pane.session.clone()).collect();
        for (target, _) in mock.split_calls() {
            prop_assert!(placed.contains(&target));
        }
        // Every pane but the root was split off a pane of the same layout
        for session in placed.iter().filter(|session| **session != root) {
            let parent = mock.pane(session).and_then(|pane| pane.parent);
            prop_assert!(parent.is_some_and(|parent| placed.contains(&parent)));
        }
    }
}
