use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::common::constants::{LOCK_POLL_MS, LOCK_STALE_SECS, LOCK_TIMEOUT_SECS};
use crate::core::mode::OperationError;

/// Cross-invocation mutual exclusion for one full mode operation. The lock
/// is a file created with `create_new`, held from before the transition
/// check until after the final state write, and removed on drop. A second
/// invocation polls until the timeout and then fails instead of blocking
/// forever.
pub struct OperationLock {
    path: PathBuf,
}

impl OperationLock {
    pub fn acquire(path: &Path) -> Result<Self, OperationError> {
        Self::acquire_with_timeout(path, Duration::from_secs(LOCK_TIMEOUT_SECS))
    }

    pub fn acquire_with_timeout(path: &Path, timeout: Duration) -> Result<Self, OperationError> {
        let deadline = Instant::now() + timeout;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    debug!(target: "ecomode::lock", "Acquired {}", path.display());
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(path, Duration::from_secs(LOCK_STALE_SECS)) {
                        warn!(
                            target: "ecomode::lock",
                            "Breaking stale lock left by a dead invocation"
                        );
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(OperationError::ConcurrentOperationInProgress);
                    }
                    std::thread::sleep(Duration::from_millis(LOCK_POLL_MS));
                }
                Err(e) => {
                    return Err(OperationError::Other(
                        anyhow::Error::new(e).context("Failed to create lock file"),
                    ));
                }
            }
        }
    }
}

fn is_stale(path: &Path, max_age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age > max_age)
        .unwrap_or(false)
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(
                target: "ecomode::lock",
                "Could not release {}: {e}",
                self.path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("op.lock");

        {
            let _lock = OperationLock::acquire_with_timeout(&path, Duration::ZERO).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("op.lock");

        let _held = OperationLock::acquire_with_timeout(&path, Duration::ZERO).unwrap();
        match OperationLock::acquire_with_timeout(&path, Duration::from_millis(50)) {
            Err(OperationError::ConcurrentOperationInProgress) => {}
            Err(other) => panic!("expected ConcurrentOperationInProgress, got {other:?}"),
            Ok(_) => panic!("lock acquired while already held"),
        }
    }

    #[test]
    fn test_released_lock_can_be_reacquired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("op.lock");

        drop(OperationLock::acquire_with_timeout(&path, Duration::ZERO).unwrap());
        let _again = OperationLock::acquire_with_timeout(&path, Duration::ZERO).unwrap();
    }
}
