use anyhow::Result;

use crate::core::snapshot::{ServiceEntry, StartupItem, StartupKind, WirelessAdapter};

/// Everything the engine needs from the operating system. The production
/// implementation shells out to system utilities; tests use an in-memory
/// fake. All mutations report their outcome instead of unwinding, so the
/// callers can aggregate partial failures.
pub trait ControlSurface {
    fn active_power_plan(&self) -> Result<String>;
    fn set_active_power_plan(&self, id: &str) -> Result<()>;

    /// Brightness in percent (0-100).
    fn brightness(&self) -> Result<u8>;
    fn set_brightness(&self, percent: u8) -> Result<()>;

    fn execution_policy(&self) -> Result<String>;

    /// The wireless adapter to manage, if the machine has one.
    fn wireless_adapter(&self) -> Result<Option<WirelessAdapter>>;
    fn set_wireless_enabled(&self, id: &str, enabled: bool) -> Result<()>;

    fn service_state(&self, name: &str) -> Result<ServiceEntry>;
    fn set_service_state(&self, name: &str, startup: StartupKind, running: bool) -> Result<()>;

    /// Enumerates both startup-item sources (registry run key entries and
    /// startup-folder shortcuts).
    fn startup_items(&self) -> Result<Vec<StartupItem>>;
    fn restore_startup_item(&self, item: &StartupItem) -> Result<()>;

    fn enable_bluetooth_device(&self) -> Result<()>;

    fn set_battery_threshold(&self, percent: u8) -> Result<()>;
    fn set_display_timeout(&self, minutes: u32) -> Result<()>;
    fn set_background_apps_disabled(&self, disabled: bool) -> Result<()>;

    fn set_search_indexing_disabled(&self, disabled: bool) -> Result<()>;
    fn set_prefetch_disabled(&self, disabled: bool) -> Result<()>;
    fn set_diagnostics_tracking_disabled(&self, disabled: bool) -> Result<()>;
    fn set_visual_effects_reduced(&self, reduced: bool) -> Result<()>;
    fn set_notifications_disabled(&self, disabled: bool) -> Result<()>;

    /// Registers a one-shot deferred invocation of this tool, superseding
    /// any scheduled task of the same name.
    fn schedule_one_shot(&self, name: &str, delay_minutes: u32, args: &[&str]) -> Result<()>;
    fn cancel_scheduled(&self, name: &str) -> Result<()>;
}
