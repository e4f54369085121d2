//! Installer mode: put a staged binary in place of the target and relaunch it.
//!
//! The installer runs as a separate process, started by the program being
//! replaced just before that program exits. It walks a fixed sequence of
//! states:
//!
//! ```text
//! Wait -> Replace -> Permission -> Relaunch -> Done
//!            |
//!            +-> Failed
//! ```
//!
//! - **Wait** gives the parent time to exit and release its binary.
//! - **Replace** backs up the target, then tries [`ReplaceStrategy::Rename`]
//!   with exponential backoff and falls back to
//!   [`ReplaceStrategy::CopyThenDelete`]. A rename that can never succeed
//!   (staging on another filesystem, a missing path) goes straight to the
//!   copy. Either way the target ends up with the staging file's bytes and
//!   the staging file is gone.
//! - **Failed** is entered only if both strategies fail. The backup is put
//!   back, the staging file is deleted, and the process exits non-zero.
//! - **Permission** marks the target executable on Unix.
//! - **Relaunch** starts the new binary detached. A failed relaunch is logged
//!   and does not undo the install.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use crate::core::UpdateError;
use crate::upgrade::backup::BackupManager;
use crate::upgrade::config::UpgradeConfig;
use crate::utils::ProcessSpawner;
use crate::utils::platform::set_executable;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, error, info, warn};

/// The two positional arguments of installer mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Complete downloaded binary.
    pub staging: PathBuf,
    /// Executable to replace.
    pub target: PathBuf,
}

impl InstallRequest {
    /// Build a request from installer-mode positional arguments.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InstallUsage`] unless exactly the staging and
    /// target paths were supplied.
    pub fn from_args(args: &[PathBuf]) -> Result<Self, UpdateError> {
        match args {
            [staging, target] => Ok(Self {
                staging: staging.clone(),
                target: target.clone(),
            }),
            _ => Err(UpdateError::InstallUsage {
                found: args.len(),
            }),
        }
    }
}

/// States of an install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Wait,
    Replace,
    Permission,
    Relaunch,
    Done,
    Failed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wait => "wait",
            Self::Replace => "replace",
            Self::Permission => "permission",
            Self::Relaunch => "relaunch",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How the staging file is moved onto the target.
///
/// Both variants leave the same result behind: the target holds the staging
/// file's bytes and the staging file no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Delete the target, then rename staging over it. Atomic when both paths
    /// are on the same filesystem.
    Rename,
    /// Copy staging onto the target, sync it, then delete staging. Works
    /// across filesystems, but a crash mid-copy leaves a partial target.
    CopyThenDelete,
}

impl ReplaceStrategy {
    /// Apply this strategy once.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the rename or copy. Failing to delete the
    /// target before a rename, or the staging file after a copy, is only
    /// logged.
    pub async fn apply(self, staging: &Path, target: &Path) -> std::io::Result<()> {
        match self {
            Self::Rename => {
                remove_if_present(target).await;
                fs::rename(staging, target).await
            }
            Self::CopyThenDelete => {
                fs::copy(staging, target).await?;
                fs::OpenOptions::new().write(true).open(target).await?.sync_all().await?;
                if let Err(e) = fs::remove_file(staging).await {
                    warn!("Copied update into place but could not remove {}: {}", staging.display(), e);
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ReplaceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => f.write_str("rename"),
            Self::CopyThenDelete => f.write_str("copy"),
        }
    }
}

/// Whether another rename attempt could succeed after `err`.
///
/// Cross-device and missing-path failures are permanent; only these skip the
/// backoff loop.
fn is_retryable(err: &std::io::Error) -> bool {
    !matches!(err.kind(), std::io::ErrorKind::CrossesDevices | std::io::ErrorKind::NotFound)
}

async fn remove_if_present(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed old binary at {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Nothing to remove at {}", path.display());
        }
        Err(e) => debug!("Could not remove {}: {}", path.display(), e),
    }
}

/// Summary of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub strategy: ReplaceStrategy,
    pub backed_up: bool,
    pub relaunched: bool,
}

/// Runs the install state machine for one [`InstallRequest`].
pub struct Installer {
    config: UpgradeConfig,
    spawner: Arc<dyn ProcessSpawner>,
}

impl Installer {
    pub fn new(config: UpgradeConfig, spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            config,
            spawner,
        }
    }

    /// Replace `request.target` with `request.staging` and relaunch it.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ReplaceFailed`] when neither strategy could put
    /// the new binary in place. By then the backup, if any, has been restored
    /// and the staging file deleted.
    pub async fn run(&self, request: &InstallRequest) -> Result<InstallReport> {
        let InstallRequest {
            staging,
            target,
        } = request;

        self.enter(InstallState::Wait);
        let delay = self.config.install_delay();
        if !delay.is_zero() {
            debug!("Waiting {:?} for the previous process to exit", delay);
            tokio::time::sleep(delay).await;
        }

        self.enter(InstallState::Replace);
        let backup = self.take_backup(target).await;

        let strategy = match self.replace(staging, target).await {
            Ok(strategy) => strategy,
            Err(e) => {
                self.enter(InstallState::Failed);
                return Err(self.fail(staging, target, backup.as_ref(), e).await.into());
            }
        };
        info!("Installed {} using {}", target.display(), strategy);

        self.enter(InstallState::Permission);
        if let Err(e) = set_executable(target).await {
            warn!("{:#}", e);
        }

        if let Some(backup) = &backup
            && let Err(e) = backup.cleanup_backup().await
        {
            warn!("Failed to remove backup: {:#}", e);
        }

        self.enter(InstallState::Relaunch);
        let relaunched = match self.spawner.spawn_detached(target, &[]) {
            Ok(pid) => {
                info!("Relaunched {} (pid {})", target.display(), pid);
                true
            }
            Err(e) => {
                error!("Update installed but relaunch failed: {:#}", e);
                false
            }
        };

        self.enter(InstallState::Done);
        Ok(InstallReport {
            strategy,
            backed_up: backup.is_some(),
            relaunched,
        })
    }

    fn enter(&self, state: InstallState) {
        debug!(state = %state, "Installer state");
    }

    async fn take_backup(&self, target: &Path) -> Option<BackupManager> {
        if !self.config.auto_backup || !target.exists() {
            return None;
        }

        let manager = BackupManager::new(target.to_path_buf());
        match manager.create_backup().await {
            Ok(()) => Some(manager),
            Err(e) => {
                warn!("Continuing without a backup: {:#}", e);
                None
            }
        }
    }

    async fn replace(&self, staging: &Path, target: &Path) -> Result<ReplaceStrategy> {
        let retries = self.config.replace_attempts().saturating_sub(1) as usize;
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .take(retries);

        let renamed = RetryIf::start(
            backoff,
            move || async move {
                ReplaceStrategy::Rename.apply(staging, target).await.inspect_err(|e| {
                    debug!("Rename {} -> {} failed: {}", staging.display(), target.display(), e);
                })
            },
            is_retryable,
        )
        .await;

        match renamed {
            Ok(()) => Ok(ReplaceStrategy::Rename),
            Err(e) => {
                warn!("Rename failed ({}), falling back to copy", e);
                ReplaceStrategy::CopyThenDelete
                    .apply(staging, target)
                    .await
                    .with_context(|| format!("Failed to copy {} to {}", staging.display(), target.display()))?;
                Ok(ReplaceStrategy::CopyThenDelete)
            }
        }
    }

    async fn fail(
        &self,
        staging: &Path,
        target: &Path,
        backup: Option<&BackupManager>,
        cause: anyhow::Error,
    ) -> UpdateError {
        error!("Could not install update: {:#}", cause);

        if let Some(backup) = backup
            && let Err(e) = backup.restore_backup().await
        {
            error!("Failed to restore previous binary: {:#}", e);
        }

        match fs::remove_file(staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging file {}: {}", staging.display(), e),
        }

        UpdateError::ReplaceFailed {
            target: target.display().to_string(),
            reason: format!("{cause:#}"),
        }
    }
}
