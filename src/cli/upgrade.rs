//! `nametag upgrade`: explicit update commands.
//!
//! Runs the same check, download, and handoff cycle as the startup check, but
//! on request and with console output. Unlike the startup check, a cycle that
//! is skipped because of an error makes the command fail.
//!
//! ```bash
//! nametag upgrade                                  # update now
//! nametag upgrade --check                          # only report
//! nametag upgrade --manifest-url https://host/latest.json
//! nametag upgrade --rollback                       # restore nametag.backup
//! ```

use crate::cli::{Flow, installer_spawner};
use crate::config::GlobalConfig;
use crate::core::UpdateError;
use crate::upgrade::backup::BackupManager;
use crate::upgrade::{UpdateCheck, UpdateOutcome, Updater, VersionChecker};
use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

/// Arguments for `nametag upgrade`.
#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// Only check whether an update is available.
    #[arg(long)]
    pub check: bool,

    /// Restore the backup left behind by a failed install.
    #[arg(long, conflicts_with_all = ["check", "manifest_url"])]
    pub rollback: bool,

    /// Manifest to check instead of `upgrade.manifest_url`.
    #[arg(long, value_name = "URL")]
    pub manifest_url: Option<String>,
}

/// Execute `nametag upgrade`.
///
/// # Errors
///
/// Fails if no manifest URL is known, if the check fails, if the cycle is
/// skipped, or if a rollback has no backup to restore.
pub async fn execute(args: UpgradeArgs, config: &GlobalConfig, config_path: Option<&Path>) -> Result<Flow> {
    let current_exe = std::env::current_exe().context("Failed to get current executable path")?;

    if args.rollback {
        handle_rollback(&current_exe).await?;
        return Ok(Flow::Done);
    }

    let manifest_url = args
        .manifest_url
        .as_deref()
        .or(config.upgrade.manifest_url.as_deref())
        .ok_or(UpdateError::ManifestUrlMissing)?;

    let updater = Updater::new(&config.upgrade, current_exe)?.with_spawner(Arc::new(installer_spawner(config_path)));

    if args.check {
        check_for_updates(&updater, manifest_url).await?;
        return Ok(Flow::Done);
    }

    perform_upgrade(&updater, manifest_url).await
}

async fn handle_rollback(current_exe: &Path) -> Result<()> {
    println!("{}", "Rolling back to previous version...".yellow());

    let backup_manager = BackupManager::new(current_exe.to_path_buf());
    backup_manager.restore_backup().await.context("Failed to restore from backup")?;

    println!("{}", "Successfully rolled back to previous version".green());
    Ok(())
}

async fn check_for_updates(updater: &Updater, manifest_url: &str) -> Result<()> {
    println!("{}", "Checking for updates...".cyan());

    let latest = match updater.check(manifest_url).await? {
        UpdateCheck::Available(manifest) => Some(manifest.version),
        UpdateCheck::UpToDate => None,
    };

    println!("{}", VersionChecker::format_version_info(updater.current_version(), latest.as_deref()));
    if latest.is_some() {
        println!("Run `nametag upgrade` to install it");
    }
    Ok(())
}

async fn perform_upgrade(updater: &Updater, manifest_url: &str) -> Result<Flow> {
    println!("{}", "Checking for updates...".cyan());

    match updater.check_and_update(manifest_url).await {
        UpdateOutcome::UpToDate => {
            println!("{}", format!("Already on the latest version ({})", updater.current_version()).green());
            Ok(Flow::Done)
        }
        UpdateOutcome::HandedOff {
            installer_pid, ..
        } => {
            println!(
                "{}",
                format!("Update downloaded. Installing in the background (pid {installer_pid})...").green()
            );
            Ok(Flow::HandedOff)
        }
        UpdateOutcome::Skipped {
            reason,
        } => bail!("Upgrade failed: {reason}"),
    }
}
