use crate::constants::BACKUP_SUFFIX;
use crate::core::UpdateError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Keeps a copy of the installed binary while the installer replaces it.
///
/// The installer deletes the target before renaming the staging file onto it.
/// If both the rename and the fallback copy then fail, the target would be
/// gone with nothing in its place. `BackupManager` closes that window: it
/// copies the target to `<target>.backup` first and can put it back.
///
/// # Lifecycle
///
/// 1. [`create_backup`](Self::create_backup) before the target is deleted
/// 2. [`cleanup_backup`](Self::cleanup_backup) after a successful install, or
///    [`restore_backup`](Self::restore_backup) after a failed one
///
/// A backup left on disk therefore means an install failed and the restore
/// failed too; `nametag upgrade --rollback` retries the restore.
///
/// # Examples
///
/// ```rust,no_run
/// use nametag_cli::upgrade::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let manager = BackupManager::new(PathBuf::from("/usr/local/bin/nametag"));
/// manager.create_backup().await?;
/// // ... replace the binary ...
/// manager.cleanup_backup().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Path to the installed binary.
    original_path: PathBuf,
    /// Path where the backup is stored.
    backup_path: PathBuf,
}

impl BackupManager {
    /// Create a manager for `executable_path`; the backup sits next to it.
    pub fn new(executable_path: PathBuf) -> Self {
        let mut backup_path = executable_path.clone();
        backup_path.set_file_name(format!(
            "{}{}",
            executable_path.file_name().unwrap_or_default().to_string_lossy(),
            BACKUP_SUFFIX
        ));

        Self {
            original_path: executable_path,
            backup_path,
        }
    }

    /// Copy the binary to the backup location, replacing any older backup.
    ///
    /// Permissions are preserved on Unix.
    ///
    /// # Errors
    ///
    /// Fails if the binary does not exist or the copy fails.
    pub async fn create_backup(&self) -> Result<()> {
        if !self.original_path.exists() {
            anyhow::bail!("Original file does not exist: {}", self.original_path.display());
        }

        if self.backup_path.exists() {
            debug!("Removing old backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path).await.context("Failed to remove old backup")?;
        }

        info!("Creating backup at {}", self.backup_path.display());
        fs::copy(&self.original_path, &self.backup_path)
            .await
            .context("Failed to create backup")?;

        #[cfg(unix)]
        {
            let permissions = fs::metadata(&self.original_path)
                .await
                .context("Failed to read original file metadata")?
                .permissions();
            fs::set_permissions(&self.backup_path, permissions)
                .await
                .context("Failed to set backup permissions")?;
        }

        Ok(())
    }

    /// Put the backup back in place of the binary.
    ///
    /// Retried up to three times, one second apart, since the target may still
    /// be held open by a process that is on its way out.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::BackupNotFound`] if there is no backup, or the
    /// last copy error after all attempts.
    pub async fn restore_backup(&self) -> Result<()> {
        if !self.backup_path.exists() {
            return Err(UpdateError::BackupNotFound {
                path: self.backup_path.display().to_string(),
            }
            .into());
        }

        warn!("Restoring from backup at {}", self.backup_path.display());

        const MAX_ATTEMPTS: u32 = 3;
        let mut attempt = 1;
        loop {
            match self.attempt_restore().await {
                Ok(()) => {
                    info!("Restored {} from backup", self.original_path.display());
                    return Ok(());
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!("Restore attempt {} failed: {:#}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("Failed to restore backup after {MAX_ATTEMPTS} attempts")));
                }
            }
        }
    }

    async fn attempt_restore(&self) -> Result<()> {
        match fs::remove_file(&self.original_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Failed to remove partially installed binary"),
        }

        fs::copy(&self.backup_path, &self.original_path)
            .await
            .context("Failed to copy backup into place")?;

        #[cfg(unix)]
        {
            let permissions = fs::metadata(&self.backup_path)
                .await
                .context("Failed to read backup metadata")?
                .permissions();
            fs::set_permissions(&self.original_path, permissions)
                .await
                .context("Failed to restore permissions")?;
        }

        // A restored binary makes the backup redundant.
        fs::remove_file(&self.backup_path).await.context("Failed to remove restored backup")?;
        Ok(())
    }

    /// Remove the backup. Succeeds if none exists.
    ///
    /// # Errors
    ///
    /// Fails if an existing backup cannot be deleted.
    pub async fn cleanup_backup(&self) -> Result<()> {
        if self.backup_path.exists() {
            debug!("Cleaning up backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path).await.context("Failed to remove backup")?;
        }
        Ok(())
    }

    /// Whether a backup file currently exists.
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Location of the backup file.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_is_sibling() {
        let manager = BackupManager::new(PathBuf::from("/usr/local/bin/nametag"));
        assert_eq!(manager.backup_path(), Path::new("/usr/local/bin/nametag.backup"));

        let manager = BackupManager::new(PathBuf::from(r"C:\tools\nametag.exe"));
        assert!(manager.backup_path().to_string_lossy().ends_with("nametag.exe.backup"));
    }

    #[tokio::test]
    async fn test_backup_restore_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nametag");
        fs::write(&target, b"version one").await.unwrap();

        let manager = BackupManager::new(target.clone());
        assert!(!manager.backup_exists());
        manager.create_backup().await.unwrap();
        assert!(manager.backup_exists());

        // Simulate a half-written replacement.
        fs::write(&target, b"vers").await.unwrap();

        manager.restore_backup().await.unwrap();
        assert_eq!(fs::read(&target).await.unwrap(), b"version one");
        assert!(!manager.backup_exists());
    }

    #[tokio::test]
    async fn test_restore_when_target_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nametag");
        fs::write(&target, b"original").await.unwrap();

        let manager = BackupManager::new(target.clone());
        manager.create_backup().await.unwrap();
        fs::remove_file(&target).await.unwrap();

        manager.restore_backup().await.unwrap();
        assert_eq!(fs::read(&target).await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_create_backup_missing_original() {
        let temp_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("missing"));
        assert!(manager.create_backup().await.is_err());
        assert!(!manager.backup_exists());
    }

    #[tokio::test]
    async fn test_restore_without_backup() {
        let temp_dir = TempDir::new().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("nametag"));

        let err = manager.restore_backup().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::BackupNotFound { .. })));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nametag");
        fs::write(&target, b"x").await.unwrap();

        let manager = BackupManager::new(target);
        manager.create_backup().await.unwrap();
        manager.cleanup_backup().await.unwrap();
        assert!(!manager.backup_exists());
        manager.cleanup_backup().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backup_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nametag");
        fs::write(&target, b"x").await.unwrap();
        fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755)).await.unwrap();

        let manager = BackupManager::new(target);
        manager.create_backup().await.unwrap();

        let mode = fs::metadata(manager.backup_path()).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
