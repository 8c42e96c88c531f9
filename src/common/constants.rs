pub const MODE_FILE: &str = r"C:\ProgramData\ecomode\mode";
pub const SNAPSHOT_FILE: &str = r"C:\ProgramData\ecomode\snapshot.json";
pub const SETTINGS_FILE: &str = r"C:\ProgramData\ecomode\settings.toml";
pub const LOCK_FILE: &str = r"C:\ProgramData\ecomode\op.lock";

/// Name of the one-shot scheduled task that triggers the deferred restore.
pub const REVERT_TASK: &str = "EcomodeDeferredRevert";

pub const DEFAULT_BRIGHTNESS: u8 = 70;
pub const DEFAULT_EXECUTION_POLICY: &str = "Restricted";

/// Services re-enabled as a unit when bringing Bluetooth support back.
pub const BLUETOOTH_SERVICES: [&str; 4] = [
    "bthserv",
    "BthAvctpSvc",
    "BTAGService",
    "BluetoothUserService",
];

pub const BLUETOOTH_RETRY_ATTEMPTS: u32 = 5;
pub const BLUETOOTH_RETRY_BACKOFF_SECS: u64 = 5;

pub const LOCK_TIMEOUT_SECS: u64 = 10;
pub const LOCK_POLL_MS: u64 = 250;
/// A lock this old belongs to a dead invocation and is broken with a warning.
pub const LOCK_STALE_SECS: u64 = 15 * 60;
