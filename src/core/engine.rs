use tracing::{info, warn};

use crate::core::backup;
use crate::core::config::Settings;
use crate::core::mode::{Mode, OperationError, Transition, check_transition};
use crate::core::profile::{ApplyReport, OptimizationProfile, apply};
use crate::core::restore::{RestoreOutcome, RestoreReport, RetryPolicy, restore};
use crate::core::schedule::schedule_revert;
use crate::core::state::ModeTracker;
use crate::core::store::SnapshotStore;
use crate::core::surface::ControlSurface;

#[derive(Debug, Clone, Copy)]
pub struct ModeRequest {
    pub mode: Mode,
    pub enable_wifi: bool,
    pub revert_after_minutes: u32,
}

#[derive(Debug)]
pub enum OperationReport {
    /// Already restored; nothing was touched.
    NoOp,
    /// Restore requested with no pending snapshot; nothing was touched.
    NoBackup,
    Applied {
        mode: Mode,
        report: ApplyReport,
        /// None when no deferred revert was requested.
        scheduled: Option<bool>,
    },
    Restored { report: RestoreReport },
}

/// Runs one complete mode operation: guard, backup, mutate, commit. The
/// caller holds the operation lock for the whole call.
pub fn run_operation(
    req: &ModeRequest,
    surface: &dyn ControlSurface,
    tracker: &ModeTracker,
    store: &dyn SnapshotStore,
    settings: &Settings,
    retry: &RetryPolicy,
) -> Result<OperationReport, OperationError> {
    let current = tracker.current()?;
    let transition = check_transition(current, req.mode)?;

    match transition {
        Transition::NoOp => {
            warn!(
                target: "ecomode::engine",
                "Machine is already in the restored state, nothing to do"
            );
            Ok(OperationReport::NoOp)
        }
        Transition::Restore => match restore(surface, store, retry)? {
            RestoreOutcome::NoBackup => Ok(OperationReport::NoBackup),
            RestoreOutcome::Done(report) => {
                tracker.save(Mode::Restored)?;
                Ok(OperationReport::Restored { report })
            }
        },
        Transition::Enter | Transition::Reapply => {
            run_apply(req, transition, surface, tracker, store, settings)
        }
    }
}

fn run_apply(
    req: &ModeRequest,
    transition: Transition,
    surface: &dyn ControlSurface,
    tracker: &ModeTracker,
    store: &dyn SnapshotStore,
    settings: &Settings,
) -> Result<OperationReport, OperationError> {
    // Backup strictly precedes any mutation. A pending snapshot from the
    // pass being re-applied still describes the true pre-optimization
    // state, so it is kept rather than overwritten.
    let mut snapshot = match (transition, store.load()?) {
        (Transition::Reapply, Some(existing)) => {
            warn!(
                target: "ecomode::engine",
                "Keeping the pending snapshot from {}; re-applying on top of it",
                existing.captured_at
            );
            existing
        }
        (_, pending) => {
            if pending.is_some() {
                warn!(
                    target: "ecomode::engine",
                    "Found a leftover snapshot with no active optimization mode, replacing it"
                );
            }
            let fresh = backup::capture(surface, settings);
            store.save(&fresh)?;
            fresh
        }
    };

    let profile = if req.mode == Mode::PowerSaver {
        OptimizationProfile::power_saver(&settings.power_saver, req.enable_wifi)
    } else {
        OptimizationProfile::ultra_saver(&settings.ultra_saver)
    };

    let report = apply(surface, &profile, &mut snapshot);

    // persist the recorded wireless intent for the restore path, then
    // commit the mode: it reflects intent, not full success
    store.save(&snapshot)?;
    tracker.save(req.mode)?;

    if !report.all_ok() {
        info!(
            target: "ecomode::engine",
            "{} committed with {} failed directives",
            req.mode,
            report.failed()
        );
    }

    let scheduled = (req.revert_after_minutes > 0)
        .then(|| schedule_revert(surface, req.revert_after_minutes));

    Ok(OperationReport::Applied {
        mode: req.mode,
        report,
        scheduled,
    })
}
