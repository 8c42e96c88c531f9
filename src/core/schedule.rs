use tracing::{debug, error, info};

use crate::common::constants::REVERT_TASK;
use crate::core::surface::ControlSurface;

/// Registers the deferred restore, superseding any pending one. Returns
/// whether registration took; a failure is an error for the log but never
/// rolls back the mode change that already happened.
pub fn schedule_revert(surface: &dyn ControlSurface, minutes: u32) -> bool {
    if minutes == 0 {
        error!(target: "ecomode::schedule", "Refusing to schedule a revert in 0 minutes");
        return false;
    }

    // at most one pending revert: drop the old registration first
    if let Err(e) = surface.cancel_scheduled(REVERT_TASK) {
        debug!(target: "ecomode::schedule", "No previous revert task to replace: {e:#}");
    }

    match surface.schedule_one_shot(REVERT_TASK, minutes, &["--mode", "restore"]) {
        Ok(()) => {
            info!(
                target: "ecomode::schedule",
                "Automatic restore scheduled in {minutes} minutes"
            );
            true
        }
        Err(e) => {
            error!(target: "ecomode::schedule", "Failed to schedule deferred revert: {e:#}");
            false
        }
    }
}
