use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupKind {
    Automatic,
    Manual,
    Disabled,
}

impl StartupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "Automatic",
            Self::Manual => "Manual",
            Self::Disabled => "Disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub startup: StartupKind,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessAdapter {
    pub id: String,
    pub enabled: bool,
}

/// A startup entry as found in one of the two enumerated sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StartupItem {
    Registry {
        path: String,
        name: String,
        value: String,
    },
    Shortcut {
        path: String,
        target: String,
        arguments: String,
        working_dir: String,
    },
}

/// Pre-optimization machine state, captured before the first mutation and
/// consumed exactly once by the restore path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub power_plan: String,
    pub brightness: u8,
    pub execution_policy: String,
    pub wireless: Option<WirelessAdapter>,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub startup_items: Vec<StartupItem>,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}
