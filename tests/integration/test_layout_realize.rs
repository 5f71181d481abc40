//! Integration Tests for Layout Realization
//!
//! Layouts are realized against the mock emulator, which records every split
//! so the order and targets can be checked.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;

use termpilot::emulator::Orientation;
use termpilot::error::Error;
use termpilot::layout::{realize, LayoutFile, PaneLayout};
use termpilot::{Driver, DriverConfig};
use test_utils::{dev_layout, server_worker_logs, Call, Failure, MockEmulator};

#[tokio::test]
async fn test_server_worker_logs() {
    let mock = MockEmulator::new();
    let root = mock.root();

    let mapping = realize(&mock, &root, &server_worker_logs()).await.unwrap();

    assert_eq!(mapping.len(), 3);
    assert_eq!(mapping.get("Server"), Some(&root));

    let server = mapping.placed("Server").unwrap();
    let worker = mapping.placed("Worker").unwrap();
    let logs = mapping.placed("Logs").unwrap();
    assert_eq!(server.split_depth, 0);
    assert_eq!(worker.split_depth, 1);
    assert_eq!(logs.split_depth, 2);

    // The right-hand pane is split, never the root a second time
    assert_eq!(
        mock.split_calls(),
        vec![
            (root.clone(), Orientation::Vertical),
            (worker.session.clone(), Orientation::Horizontal),
        ]
    );
    assert_eq!(mock.pane(&logs.session).unwrap().parent, Some(worker.session.clone()));

    assert_eq!(mock.name_of(&root).as_deref(), Some("Server"));
    assert_eq!(mock.name_of(&worker.session).as_deref(), Some("Worker"));
    assert_eq!(mock.name_of(&logs.session).as_deref(), Some("Logs"));
}

#[tokio::test]
async fn test_single_leaf_only_labels_root() {
    let mock = MockEmulator::new();
    let root = mock.root();

    let mapping = realize(&mock, &root, &PaneLayout::leaf("Main")).await.unwrap();

    assert_eq!(mapping.get("Main"), Some(&root));
    assert!(mock.split_calls().is_empty());
    assert_eq!(
        mock.mutations(),
        vec![Call::SetName {
            session: root,
            label: "Main".to_string()
        }]
    );
}

#[tokio::test]
async fn test_grid_splits_left_before_right() {
    let mock = MockEmulator::new();
    let root = mock.root();

    let mapping = realize(&mock, &root, &dev_layout()).await.unwrap();

    assert_eq!(mapping.len(), 4);
    assert_eq!(mock.open_panes(), 4);
    let labels: Vec<_> = mapping.labels().collect();
    assert_eq!(labels, vec!["Server", "Database", "Worker", "Logs"]);

    let splits = mock.split_calls();
    assert_eq!(splits.len(), 3);
    assert_eq!(splits[0], (root.clone(), Orientation::Vertical));
    assert_eq!(splits[1], (root.clone(), Orientation::Horizontal));
    assert_eq!(splits[2].0, *mapping.get("Worker").unwrap());
}

#[tokio::test]
async fn test_duplicate_label_issues_no_calls() {
    let mock = MockEmulator::new();
    let root = mock.root();
    let layout = PaneLayout::vertical(
        PaneLayout::leaf("Logs"),
        PaneLayout::horizontal(PaneLayout::leaf("Worker"), PaneLayout::leaf("Logs")),
    );

    let err = realize(&mock, &root, &layout).await.unwrap_err();

    assert!(matches!(err, Error::DuplicateLabel { ref label } if label == "Logs"));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_failed_split_leaves_partial_layout() {
    let mock = MockEmulator::new();
    let root = mock.root();
    mock.fail_split(2, Failure::Rejected);

    let err = realize(&mock, &root, &server_worker_logs()).await.unwrap_err();

    match err {
        Error::LayoutPartiallyApplied { mapping, source } => {
            // Worker and Logs live under the failed split and were never visited
            assert_eq!(mapping.labels().collect::<Vec<_>>(), vec!["Server"]);
            assert_eq!(mapping.get("Server"), Some(&root));
            assert!(matches!(*source, Error::CommandFailed { .. }));
        }
        other => panic!("expected LayoutPartiallyApplied, got {:?}", other),
    }
    // The pane from the first split stays open
    assert_eq!(mock.open_panes(), 2);
}

#[tokio::test]
async fn test_failed_split_in_right_subtree_keeps_left_leaves() {
    let mock = MockEmulator::new();
    let root = mock.root();
    mock.fail_split(3, Failure::Gone);

    let err = realize(&mock, &root, &dev_layout()).await.unwrap_err();

    let Error::LayoutPartiallyApplied { mapping, .. } = err else {
        panic!("expected LayoutPartiallyApplied");
    };
    assert_eq!(
        mapping.labels().collect::<Vec<_>>(),
        vec!["Server", "Database"]
    );
}

#[tokio::test]
async fn test_disconnect_during_layout_is_fatal() {
    let mock = MockEmulator::new();
    let root = mock.root();
    mock.fail_split(1, Failure::Disconnected);

    let err = realize(&mock, &root, &server_worker_logs()).await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_launch_layout_sends_startup_commands() {
    let mock = MockEmulator::new();
    let root = mock.root();
    let driver = Driver::new(Arc::new(mock.clone()), DriverConfig::default());

    let file = LayoutFile {
        name: Some("dev".to_string()),
        layout: dev_layout(),
    };
    let mapping = driver.launch_layout(&root, &file).await.unwrap();

    let logs = mapping.get("Logs").unwrap();
    assert_eq!(mock.sent_text(logs), vec!["echo 'Tailing logs...'\n".to_string()]);
    assert_eq!(
        mock.sent_text(&root),
        vec!["echo 'Starting Server...'\n".to_string()]
    );

    // Commands go out only after every split
    let calls = mock.mutations();
    let last_split = calls
        .iter()
        .rposition(|call| matches!(call, Call::Split { .. }))
        .unwrap();
    let first_send = calls
        .iter()
        .position(|call| matches!(call, Call::SendText { .. }))
        .unwrap();
    assert!(last_split < first_send);
}
