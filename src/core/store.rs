use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::snapshot::SettingsSnapshot;

/// Port for the single pending snapshot record. File-backed in production,
/// in-memory in tests.
pub trait SnapshotStore {
    fn load(&self) -> Result<Option<SettingsSnapshot>>;
    fn save(&self, snapshot: &SettingsSnapshot) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<SettingsSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .context(format!("Failed to read {}", self.path.display()))?;

        let snapshot =
            serde_json::from_str(&content).context("Failed to parse snapshot file")?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &SettingsSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).context("Failed to write temporary snapshot file")?;
        fs::rename(&temp_path, &self.path).context("Failed to rename to final snapshot file")?;

        debug!(target: "ecomode::store", "Snapshot saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .context(format!("Failed to remove {}", self.path.display()))?;
            debug!(target: "ecomode::store", "Snapshot removed");
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::cell::RefCell;

    /// In-memory store for engine tests.
    #[derive(Default)]
    pub struct MemorySnapshotStore {
        slot: RefCell<Option<SettingsSnapshot>>,
    }

    impl SnapshotStore for MemorySnapshotStore {
        fn load(&self) -> Result<Option<SettingsSnapshot>> {
            Ok(self.slot.borrow().clone())
        }

        fn save(&self, snapshot: &SettingsSnapshot) -> Result<()> {
            *self.slot.borrow_mut() = Some(snapshot.clone());
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            *self.slot.borrow_mut() = None;
            Ok(())
        }
    }
}
