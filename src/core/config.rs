use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::constants::{BLUETOOTH_SERVICES, DEFAULT_BRIGHTNESS};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default = "default_power_saver")]
    pub power_saver: ProfileConfig,

    #[serde(default = "default_ultra_saver")]
    pub ultra_saver: ProfileConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Services whose startup type and running state are captured before an
    /// optimization pass touches them.
    #[serde(default = "default_tracked_services")]
    pub tracked_services: Vec<String>,

    #[serde(default = "default_fallback_brightness")]
    pub fallback_brightness: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub power_plan: String,
    pub brightness: u8,
    pub display_timeout_minutes: u32,
    pub battery_threshold: u8,
}

impl Settings {
    /// Load settings from TOML file; a missing file falls back to the
    /// built-in defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Settings file not found, using built-in defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse settings.toml")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup: BackupConfig::default(),
            power_saver: default_power_saver(),
            ultra_saver: default_ultra_saver(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            tracked_services: default_tracked_services(),
            fallback_brightness: default_fallback_brightness(),
        }
    }
}

fn default_tracked_services() -> Vec<String> {
    BLUETOOTH_SERVICES.iter().map(|s| s.to_string()).collect()
}

fn default_fallback_brightness() -> u8 {
    DEFAULT_BRIGHTNESS
}

fn default_power_saver() -> ProfileConfig {
    ProfileConfig {
        // stock "Power saver" scheme
        power_plan: "a1841308-3541-4fab-bc81-f71556f20b4a".to_string(),
        brightness: 40,
        display_timeout_minutes: 5,
        battery_threshold: 50,
    }
}

fn default_ultra_saver() -> ProfileConfig {
    ProfileConfig {
        power_plan: "a1841308-3541-4fab-bc81-f71556f20b4a".to_string(),
        brightness: 30,
        display_timeout_minutes: 2,
        battery_threshold: 100,
    }
}
