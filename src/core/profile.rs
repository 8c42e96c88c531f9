use anyhow::Result;
use tracing::{debug, info, warn};

use crate::common::constants::BLUETOOTH_SERVICES;
use crate::core::config::ProfileConfig;
use crate::core::mode::Mode;
use crate::core::snapshot::{SettingsSnapshot, StartupKind};
use crate::core::surface::ControlSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirelessPolicy {
    ForceDisable,
    ForceEnable,
    LeaveAsConfigured,
}

/// A named, static set of mutation directives. Built in code, never
/// persisted, immutable once constructed.
#[derive(Debug, Clone)]
pub struct OptimizationProfile {
    pub mode: Mode,
    pub power_plan: String,
    pub brightness: u8,
    pub wireless: WirelessPolicy,
    pub disable_services: Vec<String>,
    pub battery_threshold: u8,
    pub display_timeout_minutes: u32,
    pub disable_background_apps: bool,
    pub ultra_extras: bool,
}

impl OptimizationProfile {
    pub fn power_saver(cfg: &ProfileConfig, enable_wifi: bool) -> Self {
        Self {
            mode: Mode::PowerSaver,
            power_plan: cfg.power_plan.clone(),
            brightness: cfg.brightness,
            wireless: if enable_wifi {
                WirelessPolicy::ForceEnable
            } else {
                WirelessPolicy::ForceDisable
            },
            disable_services: BLUETOOTH_SERVICES.iter().map(|s| s.to_string()).collect(),
            battery_threshold: cfg.battery_threshold,
            display_timeout_minutes: cfg.display_timeout_minutes,
            disable_background_apps: true,
            ultra_extras: false,
        }
    }

    /// UltraSaver ignores any Wi-Fi override and always takes the radio down.
    pub fn ultra_saver(cfg: &ProfileConfig) -> Self {
        Self {
            mode: Mode::UltraSaver,
            power_plan: cfg.power_plan.clone(),
            brightness: cfg.brightness,
            wireless: WirelessPolicy::ForceDisable,
            disable_services: BLUETOOTH_SERVICES.iter().map(|s| s.to_string()).collect(),
            battery_threshold: cfg.battery_threshold,
            display_timeout_minutes: cfg.display_timeout_minutes,
            disable_background_apps: true,
            ultra_extras: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveOutcome {
    pub directive: String,
    pub ok: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ApplyReport {
    pub outcomes: Vec<DirectiveOutcome>,
}

impl ApplyReport {
    fn record(&mut self, directive: &str, result: Result<()>) {
        match result {
            Ok(()) => {
                debug!(target: "ecomode::profile", "{directive}: done");
                self.outcomes.push(DirectiveOutcome {
                    directive: directive.to_string(),
                    ok: true,
                    detail: None,
                });
            }
            Err(e) => {
                warn!(target: "ecomode::profile", "{directive} failed: {e:#}");
                self.outcomes.push(DirectiveOutcome {
                    directive: directive.to_string(),
                    ok: false,
                    detail: Some(format!("{e:#}")),
                });
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.ok).count()
    }

    pub fn all_ok(&self) -> bool {
        self.failed() == 0
    }
}

/// Issues the profile's mutation sequence in its fixed order. Every
/// directive is attempted regardless of earlier failures; outcomes are
/// collected into the report, never propagated.
///
/// The resolved wireless policy is written back into the pending snapshot
/// so the restore path knows whether the adapter should come back up.
pub fn apply(
    surface: &dyn ControlSurface,
    profile: &OptimizationProfile,
    snapshot: &mut SettingsSnapshot,
) -> ApplyReport {
    info!(target: "ecomode::profile", "Applying {} profile", profile.mode);
    let mut report = ApplyReport::default();

    report.record(
        "power-plan",
        surface.set_active_power_plan(&profile.power_plan),
    );
    report.record("brightness", surface.set_brightness(profile.brightness));

    match profile.wireless {
        WirelessPolicy::LeaveAsConfigured => {
            debug!(target: "ecomode::profile", "Wireless left as configured");
        }
        policy => {
            if let Some(adapter) = snapshot.wireless.as_mut() {
                let enable = policy == WirelessPolicy::ForceEnable;
                report.record("wireless", surface.set_wireless_enabled(&adapter.id, enable));
                adapter.enabled = enable;
            } else {
                debug!(target: "ecomode::profile", "No wireless adapter captured, skipping");
            }
        }
    }

    for name in &profile.disable_services {
        report.record(
            &format!("service:{name}"),
            surface.set_service_state(name, StartupKind::Disabled, false),
        );
    }

    report.record(
        "battery-threshold",
        surface.set_battery_threshold(profile.battery_threshold),
    );
    report.record(
        "display-timeout",
        surface.set_display_timeout(profile.display_timeout_minutes),
    );

    if profile.disable_background_apps {
        report.record(
            "background-apps",
            surface.set_background_apps_disabled(true),
        );
    }

    if profile.ultra_extras {
        report.record(
            "search-indexing",
            surface.set_search_indexing_disabled(true),
        );
        report.record("prefetch", surface.set_prefetch_disabled(true));
        report.record(
            "diagnostics-tracking",
            surface.set_diagnostics_tracking_disabled(true),
        );
        report.record(
            "visual-effects",
            surface.set_visual_effects_reduced(true),
        );
        report.record(
            "notifications",
            surface.set_notifications_disabled(true),
        );
    }

    info!(
        target: "ecomode::profile",
        "{} profile applied: {} directives, {} failed",
        profile.mode,
        report.attempted(),
        report.failed()
    );
    report
}
