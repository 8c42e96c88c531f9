use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::mode::Mode;

/// File-backed record of the last successfully applied mode. The file holds
/// a single plain-text token; absence means no mode was ever set.
pub struct ModeTracker {
    path: PathBuf,
}

impl ModeTracker {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<Option<Mode>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .context(format!("Failed to read {}", self.path.display()))?;

        match Mode::parse(&content) {
            Some(mode) => Ok(Some(mode)),
            None => bail!(
                "Unrecognized mode token {:?} in {}",
                content.trim(),
                self.path.display()
            ),
        }
    }

    /// The mode the transition guard should reason about: an absent record
    /// counts as restored.
    pub fn current(&self) -> Result<Mode> {
        Ok(self.load()?.unwrap_or(Mode::Restored))
    }

    pub fn save(&self, mode: Mode) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, mode.as_str()).context("Failed to write temporary mode file")?;
        fs::rename(&temp_path, &self.path).context("Failed to rename to final mode file")?;

        debug!(target: "ecomode::state", "Mode recorded as {}", mode);
        Ok(())
    }
}
