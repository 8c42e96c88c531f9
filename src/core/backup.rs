use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::common::constants::DEFAULT_EXECUTION_POLICY;
use crate::core::config::Settings;
use crate::core::snapshot::SettingsSnapshot;
use crate::core::surface::ControlSurface;

/// Captures the current machine state ahead of an optimization pass.
///
/// Capture never fails as a whole: any field that cannot be read is logged
/// and left at a safe default so a later restore still replays everything
/// that was readable.
pub fn capture(surface: &dyn ControlSurface, settings: &Settings) -> SettingsSnapshot {
    debug!(target: "ecomode::backup", "Capturing current system state");

    let power_plan = match surface.active_power_plan() {
        Ok(id) => id,
        Err(e) => {
            warn!(target: "ecomode::backup", "Could not read active power plan: {e:#}");
            String::new()
        }
    };

    let brightness = match surface.brightness() {
        Ok(percent) => percent,
        Err(e) => {
            warn!(
                target: "ecomode::backup",
                "Could not read brightness, recording fallback {}%: {e:#}",
                settings.backup.fallback_brightness
            );
            settings.backup.fallback_brightness
        }
    };

    let execution_policy = match surface.execution_policy() {
        Ok(value) => value,
        Err(e) => {
            warn!(target: "ecomode::backup", "Could not read execution policy: {e:#}");
            DEFAULT_EXECUTION_POLICY.to_string()
        }
    };

    let wireless = match surface.wireless_adapter() {
        Ok(adapter) => adapter,
        Err(e) => {
            warn!(target: "ecomode::backup", "Could not identify wireless adapter: {e:#}");
            None
        }
    };

    let services = settings
        .backup
        .tracked_services
        .iter()
        .filter_map(|name| match surface.service_state(name) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(target: "ecomode::backup", "Could not read service {name}: {e:#}");
                None
            }
        })
        .collect();

    let startup_items = match surface.startup_items() {
        Ok(items) => items,
        Err(e) => {
            warn!(target: "ecomode::backup", "Could not enumerate startup items: {e:#}");
            Vec::new()
        }
    };

    SettingsSnapshot {
        power_plan,
        brightness,
        execution_policy,
        wireless,
        services,
        startup_items,
        captured_at: OffsetDateTime::now_utc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::StartupKind;
    use crate::core::surface::fake::FakeSurface;

    #[test]
    fn test_capture_reads_every_field() {
        let surface = FakeSurface::new();
        let settings = Settings::default();

        let snapshot = capture(&surface, &settings);

        assert_eq!(snapshot.power_plan, "381b4222-f694-41f0-9685-ff5bb260df2e");
        assert_eq!(snapshot.brightness, 70);
        assert_eq!(snapshot.execution_policy, "RemoteSigned");
        assert_eq!(snapshot.wireless.as_ref().unwrap().id, "Wi-Fi");
        assert_eq!(snapshot.services.len(), settings.backup.tracked_services.len());
        assert_eq!(snapshot.startup_items.len(), 2);
        for entry in &snapshot.services {
            assert_eq!(entry.startup, StartupKind::Manual);
            assert!(entry.running);
        }
    }

    #[test]
    fn test_unreadable_fields_fall_back_to_defaults() {
        let surface = FakeSurface::new();
        surface.fail("brightness");
        surface.fail("wireless_adapter");
        surface.fail("startup_items");
        surface.fail("service_state:bthserv");
        let settings = Settings::default();

        let snapshot = capture(&surface, &settings);

        assert_eq!(snapshot.brightness, settings.backup.fallback_brightness);
        assert_eq!(snapshot.wireless, None);
        assert!(snapshot.startup_items.is_empty());
        // the unreadable service is skipped, the rest are captured
        assert_eq!(
            snapshot.services.len(),
            settings.backup.tracked_services.len() - 1
        );
        assert!(snapshot.services.iter().all(|s| s.name != "bthserv"));
    }
}
