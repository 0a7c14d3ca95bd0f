// Daemon socket lifecycle
//
// Handles stale socket removal before bind, owner-only permissions after
// bind, and removal of the socket file on shutdown.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SOCKET_MODE: u32 = 0o600;

/// Owns the socket file path for the lifetime of the daemon
///
/// The file is removed by [`cleanup`](Self::cleanup) or, failing that, on drop.
#[derive(Debug)]
pub struct SocketGuard {
    path: PathBuf,
}

impl SocketGuard {
    /// Take ownership of `path`, deleting whatever a previous run left there
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        remove_socket_file(&path)?;
        Ok(Self { path })
    }

    /// Restrict the bound socket to its owner
    pub fn restrict_permissions(&self) -> Result<()> {
        fs::set_permissions(&self.path, fs::Permissions::from_mode(SOCKET_MODE)).with_context(
            || format!("Failed to set permissions on {}", self.path.display()),
        )
    }

    /// Remove the socket file (called on shutdown)
    pub fn cleanup(&self) -> Result<()> {
        if remove_socket_file(&self.path)? {
            info!(path = %self.path.display(), "Daemon socket removed");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Err(e) = remove_socket_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove daemon socket");
        }
    }
}

/// Delete the file at `path` if present; returns whether anything was removed
fn remove_socket_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_removes_stale_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("refiner.sock");
        fs::write(&path, "stale").unwrap();

        let guard = SocketGuard::prepare(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(guard.path(), path.as_path());
    }

    #[test]
    fn test_prepare_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("refiner.sock");

        let _guard = SocketGuard::prepare(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_permissions_and_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("refiner.sock");

        let guard = SocketGuard::prepare(&path).unwrap();
        fs::write(&path, "").unwrap();
        guard.restrict_permissions().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        guard.cleanup().unwrap();
        assert!(!path.exists());
        // Cleaning up twice is fine
        guard.cleanup().unwrap();
    }

    #[test]
    fn test_drop_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("refiner.sock");

        {
            let _guard = SocketGuard::prepare(&path).unwrap();
            fs::write(&path, "").unwrap();
        }
        assert!(!path.exists());
    }
}
