use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::common::constants::{
    BLUETOOTH_RETRY_ATTEMPTS, BLUETOOTH_RETRY_BACKOFF_SECS, BLUETOOTH_SERVICES, REVERT_TASK,
};
use crate::core::snapshot::{SettingsSnapshot, StartupItem, StartupKind};
use crate::core::store::SnapshotStore;
use crate::core::surface::ControlSurface;

/// Bounded retry parameters for bringing Bluetooth support back up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: BLUETOOTH_RETRY_ATTEMPTS,
            backoff: Duration::from_secs(BLUETOOTH_RETRY_BACKOFF_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub power_plan_ok: bool,
    pub brightness_ok: bool,
    pub wireless_ok: bool,
    pub bluetooth_attempts: u32,
    pub bluetooth_ok: bool,
    pub services_restored: usize,
    pub services_failed: Vec<String>,
    pub startup_items_restored: usize,
    pub startup_items_failed: usize,
    pub snapshot_cleared: bool,
    pub schedule_cancelled: bool,
}

impl RestoreReport {
    /// Aggregate outcome. Brightness failures and an exhausted Bluetooth
    /// retry are surfaced but never clear the flag; every other step
    /// failure does.
    pub fn success(&self) -> bool {
        self.power_plan_ok
            && self.wireless_ok
            && self.services_failed.is_empty()
            && self.startup_items_failed == 0
            && self.snapshot_cleared
            && self.schedule_cancelled
    }
}

#[derive(Debug)]
pub enum RestoreOutcome {
    /// The store holds no snapshot; nothing was touched.
    NoBackup,
    Done(RestoreReport),
}

/// Replays the pending snapshot, step by step, tolerating individual step
/// failures. Every step is safe to repeat, so an interrupted restore can be
/// re-run as-is.
pub fn restore(
    surface: &dyn ControlSurface,
    store: &dyn SnapshotStore,
    retry: &RetryPolicy,
) -> Result<RestoreOutcome> {
    let Some(snapshot) = store.load()? else {
        warn!(target: "ecomode::restore", "No backup snapshot found, nothing to restore");
        return Ok(RestoreOutcome::NoBackup);
    };

    info!(
        target: "ecomode::restore",
        "Restoring settings captured at {}",
        snapshot.captured_at
    );

    let power_plan_ok = restore_power_plan(surface, &snapshot);
    let brightness_ok = restore_brightness(surface, &snapshot);
    let wireless_ok = restore_wireless(surface, &snapshot);
    let (bluetooth_attempts, bluetooth_ok) = reenable_bluetooth(surface, retry);
    let (services_restored, services_failed) = restore_services(surface, &snapshot);
    let (startup_items_restored, startup_items_failed) = restore_startup_items(surface, &snapshot);

    let snapshot_cleared = match store.clear() {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "ecomode::restore", "Could not remove consumed snapshot: {e:#}");
            false
        }
    };

    let schedule_cancelled = match surface.cancel_scheduled(REVERT_TASK) {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "ecomode::restore", "Could not cancel deferred revert task: {e:#}");
            false
        }
    };

    let report = RestoreReport {
        power_plan_ok,
        brightness_ok,
        wireless_ok,
        bluetooth_attempts,
        bluetooth_ok,
        services_restored,
        services_failed,
        startup_items_restored,
        startup_items_failed,
        snapshot_cleared,
        schedule_cancelled,
    };

    info!(
        target: "ecomode::restore",
        "Restore finished (success: {}, services: {}/{}, startup items: {}/{}, bluetooth attempts: {})",
        report.success(),
        report.services_restored,
        report.services_restored + report.services_failed.len(),
        report.startup_items_restored,
        report.startup_items_restored + report.startup_items_failed,
        report.bluetooth_attempts
    );

    Ok(RestoreOutcome::Done(report))
}

fn restore_power_plan(surface: &dyn ControlSurface, snapshot: &SettingsSnapshot) -> bool {
    if snapshot.power_plan.is_empty() {
        debug!(target: "ecomode::restore", "No power plan captured, skipping");
        return true;
    }
    match surface.set_active_power_plan(&snapshot.power_plan) {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "ecomode::restore", "Could not restore power plan: {e:#}");
            false
        }
    }
}

fn restore_brightness(surface: &dyn ControlSurface, snapshot: &SettingsSnapshot) -> bool {
    match surface.set_brightness(snapshot.brightness) {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "ecomode::restore", "Could not restore brightness: {e:#}");
            false
        }
    }
}

fn restore_wireless(surface: &dyn ControlSurface, snapshot: &SettingsSnapshot) -> bool {
    match &snapshot.wireless {
        None => {
            debug!(target: "ecomode::restore", "No wireless adapter captured, skipping");
            true
        }
        Some(adapter) if !adapter.enabled => {
            // captured disabled: do not issue the enable call at all
            debug!(
                target: "ecomode::restore",
                "Adapter {} was disabled before optimization, leaving it down",
                adapter.id
            );
            true
        }
        Some(adapter) => match surface.set_wireless_enabled(&adapter.id, true) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    target: "ecomode::restore",
                    "Could not re-enable wireless adapter {}: {e:#}",
                    adapter.id
                );
                false
            }
        },
    }
}

/// Bluetooth support is re-enabled unconditionally: each attempt sets
/// automatic startup and starts all Bluetooth services, then re-enables the
/// device. The loop exits on the first fully successful attempt.
fn reenable_bluetooth(surface: &dyn ControlSurface, retry: &RetryPolicy) -> (u32, bool) {
    for attempt in 1..=retry.attempts {
        let mut attempt_ok = true;

        for name in BLUETOOTH_SERVICES {
            if let Err(e) = surface.set_service_state(name, StartupKind::Automatic, true) {
                warn!(
                    target: "ecomode::restore",
                    "Bluetooth service {name} not restarted (attempt {attempt}): {e:#}"
                );
                attempt_ok = false;
            }
        }

        if let Err(e) = surface.enable_bluetooth_device() {
            warn!(
                target: "ecomode::restore",
                "Bluetooth device not re-enabled (attempt {attempt}): {e:#}"
            );
            attempt_ok = false;
        }

        if attempt_ok {
            debug!(
                target: "ecomode::restore",
                "Bluetooth support restored on attempt {attempt}"
            );
            return (attempt, true);
        }

        if attempt < retry.attempts {
            std::thread::sleep(retry.backoff);
        }
    }

    warn!(
        target: "ecomode::restore",
        "Bluetooth support not fully restored after {} attempts",
        retry.attempts
    );
    (retry.attempts, false)
}

fn restore_services(
    surface: &dyn ControlSurface,
    snapshot: &SettingsSnapshot,
) -> (usize, Vec<String>) {
    let mut restored = 0;
    let mut failed = Vec::new();

    for entry in &snapshot.services {
        match surface.set_service_state(&entry.name, entry.startup, entry.running) {
            Ok(()) => restored += 1,
            Err(e) => {
                warn!(
                    target: "ecomode::restore",
                    "Could not restore service {}: {e:#}",
                    entry.name
                );
                failed.push(entry.name.clone());
            }
        }
    }

    (restored, failed)
}

fn restore_startup_items(
    surface: &dyn ControlSurface,
    snapshot: &SettingsSnapshot,
) -> (usize, usize) {
    let mut restored = 0;
    let mut failed = 0;

    for item in &snapshot.startup_items {
        match surface.restore_startup_item(item) {
            Ok(()) => restored += 1,
            Err(e) => {
                let label = match item {
                    StartupItem::Registry { name, .. } => name.as_str(),
                    StartupItem::Shortcut { path, .. } => path.as_str(),
                };
                warn!(
                    target: "ecomode::restore",
                    "Could not restore startup item {label}: {e:#}"
                );
                failed += 1;
            }
        }
    }

    (restored, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backup;
    use crate::core::config::Settings;
    use crate::core::store::SnapshotStore;
    use crate::core::store::memory::MemorySnapshotStore;
    use crate::core::surface::fake::FakeSurface;

    fn no_backoff() -> RetryPolicy {
        RetryPolicy {
            attempts: BLUETOOTH_RETRY_ATTEMPTS,
            backoff: Duration::ZERO,
        }
    }

    fn captured_store(surface: &FakeSurface) -> MemorySnapshotStore {
        let store = MemorySnapshotStore::default();
        let snapshot = backup::capture(surface, &Settings::default());
        store.save(&snapshot).unwrap();
        store
    }

    #[test]
    fn test_no_backup_is_a_clean_abort() {
        let surface = FakeSurface::new();
        let store = MemorySnapshotStore::default();

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        assert!(matches!(outcome, RestoreOutcome::NoBackup));
        assert!(surface.calls.borrow().is_empty());
    }

    #[test]
    fn test_round_trip_restores_captured_state() {
        let surface = FakeSurface::new();
        let store = captured_store(&surface);
        let captured = store.load().unwrap().unwrap();

        // drift the live state after capture
        {
            let mut state = surface.state.borrow_mut();
            state.power_plan = "a1841308-3541-4fab-bc81-f71556f20b4a".to_string();
            state.brightness = 30;
            state.wireless.as_mut().unwrap().enabled = false;
            for slot in state.services.values_mut() {
                *slot = (StartupKind::Disabled, false);
            }
        }

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };
        assert!(report.success());

        let state = surface.state.borrow();
        assert_eq!(state.power_plan, captured.power_plan);
        assert_eq!(state.brightness, captured.brightness);
        assert!(state.wireless.as_ref().unwrap().enabled);
        for entry in &captured.services {
            // tracked services end up automatic+running via the Bluetooth
            // re-enable plus snapshot replay; the replay ran last
            let (startup, running) = state.services[&entry.name];
            assert_eq!(startup, entry.startup);
            assert_eq!(running, entry.running);
        }
        assert_eq!(state.replayed_items, captured.startup_items);
        drop(state);

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_disabled_adapter_is_not_reenabled() {
        let surface = FakeSurface::new();
        surface.state.borrow_mut().wireless.as_mut().unwrap().enabled = false;
        let store = captured_store(&surface);

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert!(report.wireless_ok);
        assert_eq!(surface.call_count("set_wireless_enabled"), 0);
        assert!(!surface.state.borrow().wireless.as_ref().unwrap().enabled);
    }

    #[test]
    fn test_bluetooth_retry_succeeds_on_fifth_attempt() {
        let surface = FakeSurface::new();
        surface.bluetooth_device_failures.set(4);
        let store = captured_store(&surface);

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert_eq!(report.bluetooth_attempts, 5);
        assert!(report.bluetooth_ok);
        assert!(report.success());
        assert_eq!(surface.call_count("enable_bluetooth_device"), 5);
    }

    #[test]
    fn test_bluetooth_exhaustion_is_surfaced_but_not_fatal() {
        let surface = FakeSurface::new();
        surface.fail("enable_bluetooth_device");
        let store = captured_store(&surface);

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert_eq!(report.bluetooth_attempts, BLUETOOTH_RETRY_ATTEMPTS);
        assert!(!report.bluetooth_ok);
        assert!(report.success());
    }

    #[test]
    fn test_brightness_failure_is_a_warning_only() {
        let surface = FakeSurface::new();
        surface.fail("set_brightness");
        let store = captured_store(&surface);

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert!(!report.brightness_ok);
        assert!(report.success());
    }

    #[test]
    fn test_one_failing_service_does_not_stop_the_rest() {
        let surface = FakeSurface::new();
        let store = captured_store(&surface);
        let captured = store.load().unwrap().unwrap();
        surface.fail("set_service_state:BTAGService");

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert_eq!(report.services_failed, vec!["BTAGService".to_string()]);
        assert_eq!(report.services_restored, captured.services.len() - 1);
        assert!(!report.success());
        // bluetooth retry also kept touching the other services despite the
        // failing one
        assert!(report.bluetooth_attempts >= 1);
    }

    #[test]
    fn test_startup_item_failure_keeps_the_loop_going() {
        let surface = FakeSurface::new();
        surface.fail("restore_startup_item:Updater");
        let store = captured_store(&surface);

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert_eq!(report.startup_items_failed, 1);
        assert_eq!(report.startup_items_restored, 1);
        assert!(!report.success());
    }

    #[test]
    fn test_pending_schedule_is_cancelled() {
        let surface = FakeSurface::new();
        surface
            .schedule_one_shot(REVERT_TASK, 30, &["--mode", "restore"])
            .unwrap();
        let store = captured_store(&surface);

        let outcome = restore(&surface, &store, &no_backoff()).unwrap();
        let RestoreOutcome::Done(report) = outcome else {
            panic!("expected a completed restore");
        };

        assert!(report.schedule_cancelled);
        assert_eq!(surface.state.borrow().scheduled, None);
    }
}
