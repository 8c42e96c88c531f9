use std::path::Path;
use tracing::{error, warn};

use super::app::{Cli, CliMode};
use super::output;
use crate::common::constants::{LOCK_FILE, MODE_FILE, SETTINGS_FILE, SNAPSHOT_FILE};
use crate::core::config::Settings;
use crate::core::engine::{ModeRequest, OperationReport, run_operation};
use crate::core::lock::OperationLock;
use crate::core::mode::OperationError;
use crate::core::restore::RetryPolicy;
use crate::core::state::ModeTracker;
use crate::core::store::FileSnapshotStore;
use crate::platform::WindowsSurface;

/// Runs one mode operation end to end and maps the outcome to an exit
/// code: 0 for success and warning-level aborts, 1 for hard failures.
pub fn execute(cli: Cli) -> i32 {
    match run(cli) {
        Ok(report) => {
            print_report(&report);
            0
        }
        Err(e @ OperationError::IllegalTransition { .. }) => {
            error!("{e}");
            output::print_error(&e.to_string());
            1
        }
        Err(e @ OperationError::ConcurrentOperationInProgress) => {
            error!("{e}");
            output::print_error(&e.to_string());
            1
        }
        Err(OperationError::Other(e)) => {
            error!("{e:#}");
            output::print_error(&format!("{e:#}"));
            1
        }
    }
}

fn run(cli: Cli) -> Result<OperationReport, OperationError> {
    let settings = Settings::load(SETTINGS_FILE)?;

    if cli.enable_wifi && cli.mode != CliMode::PowerSaver {
        warn!("--enable-wifi only applies to power-saver, ignoring");
    }
    if cli.revert_after_minutes > 0 && cli.mode == CliMode::Restore {
        warn!("--revert-after-minutes has no effect when restoring, ignoring");
    }

    // held across the whole operation, from before the transition check
    // until the final state write
    let _lock = OperationLock::acquire(Path::new(LOCK_FILE))?;

    let tracker = ModeTracker::new(MODE_FILE);
    let store = FileSnapshotStore::new(SNAPSHOT_FILE);
    let surface = WindowsSurface::new();

    let req = ModeRequest {
        mode: cli.mode.to_mode(),
        enable_wifi: cli.enable_wifi && cli.mode == CliMode::PowerSaver,
        revert_after_minutes: if cli.mode == CliMode::Restore {
            0
        } else {
            cli.revert_after_minutes
        },
    };

    run_operation(&req, &surface, &tracker, &store, &settings, &RetryPolicy::default())
}

fn print_report(report: &OperationReport) {
    match report {
        OperationReport::NoOp => {
            output::print_warning("machine is already restored, nothing to do");
        }
        OperationReport::NoBackup => {
            output::print_warning("no backup snapshot found, nothing to restore");
        }
        OperationReport::Applied {
            mode,
            report,
            scheduled,
        } => {
            if report.all_ok() {
                output::print_success(&format!("{mode} profile applied"));
            } else {
                output::print_warning(&format!(
                    "{mode} profile applied with {} of {} directives failed",
                    report.failed(),
                    report.attempted()
                ));
                for outcome in report.outcomes.iter().filter(|o| !o.ok) {
                    output::print_warning(&format!(
                        "  {}: {}",
                        outcome.directive,
                        outcome.detail.as_deref().unwrap_or("failed")
                    ));
                }
            }
            if *scheduled == Some(false) {
                output::print_error("automatic restore could not be scheduled");
            }
        }
        OperationReport::Restored { report } => {
            if report.success() {
                output::print_success("original settings restored");
            } else {
                output::print_warning("restore finished with failures, check the log");
            }
            if !report.brightness_ok {
                output::print_warning("brightness could not be restored");
            }
            if !report.bluetooth_ok {
                output::print_warning("Bluetooth support may still be down");
            }
        }
    }
}
