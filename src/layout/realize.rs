use super::plan::{LayoutPlan, LayoutStep};
use super::{LayoutMapping, PaneLayout, PlacedPane};
use crate::emulator::{Emulator, SessionId};
use crate::error::{Error, Result};

/// Build `layout` starting from the existing pane `root`
///
/// The root pane becomes the first leaf; every other leaf is reached through
/// exactly one new split per split node on its path.
///
/// # Errors
/// `DuplicateLabel` / `EmptyLabel` before any emulator call.
/// `LayoutPartiallyApplied` if a split or label fails; panes created so far
/// are left open and the mapping holds every leaf labeled before the failure.
/// `DriverDisconnected` is passed through unchanged.
pub async fn realize(
    emulator: &dyn Emulator,
    root: &SessionId,
    layout: &PaneLayout,
) -> Result<LayoutMapping> {
    let plan = LayoutPlan::for_layout(layout)?;
    info!(
        root = %root,
        panes = plan.slot_count(),
        splits = plan.split_count(),
        "Realizing layout"
    );
    execute(emulator, root, &plan).await
}

/// Run a precomputed plan starting from `root`
pub async fn execute(
    emulator: &dyn Emulator,
    root: &SessionId,
    plan: &LayoutPlan,
) -> Result<LayoutMapping> {
    let depths = plan.split_depths();
    let mut slots: Vec<SessionId> = Vec::with_capacity(plan.slot_count());
    slots.push(root.clone());
    let mut mapping = LayoutMapping::default();

    for step in plan.steps() {
        match step {
            LayoutStep::Split {
                target,
                orientation,
                creates,
            } => {
                let session = slot(&slots, *target)?;
                match emulator.split_session(session, *orientation).await {
                    Ok(created) => {
                        debug!(from = %session, to = %created, %orientation, "Split pane");
                        debug_assert_eq!(*creates, slots.len());
                        slots.push(created);
                    }
                    Err(err) => return Err(abort(mapping, err)),
                }
            }
            LayoutStep::Label { slot: index, label } => {
                let session = slot(&slots, *index)?.clone();
                if let Err(err) = emulator.set_name(&session, label).await {
                    return Err(abort(mapping, err));
                }
                debug!(session = %session, label = %label, "Labeled pane");
                mapping.insert(PlacedPane {
                    label: label.clone(),
                    session,
                    split_depth: depths.get(*index).copied().unwrap_or_default(),
                });
            }
        }
    }

    Ok(mapping)
}

fn slot(slots: &[SessionId], index: usize) -> Result<&SessionId> {
    slots
        .get(index)
        .ok_or_else(|| Error::Other(format!("layout plan refers to unknown pane #{}", index)))
}

fn abort(mapping: LayoutMapping, err: Error) -> Error {
    if err.is_fatal() {
        return err;
    }
    warn!(
        labeled = mapping.len(),
        "Layout aborted, leaving created panes in place: {}", err
    );
    Error::LayoutPartiallyApplied {
        mapping,
        source: Box::new(err),
    }
}
