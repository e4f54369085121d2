//! Handoff from the running program to the installer process.

use crate::constants::INSTALLER_FLAG;
use crate::utils::ProcessSpawner;
use anyhow::Result;
use std::ffi::OsString;
use std::path::Path;
use tracing::info;

/// Arguments that put `self_path` into installer mode for `staging` and `target`.
pub fn installer_args(staging: &Path, target: &Path) -> Vec<OsString> {
    vec![OsString::from(INSTALLER_FLAG), staging.as_os_str().to_owned(), target.as_os_str().to_owned()]
}

/// Start `self_path --update-install <staging> <target>` without waiting.
///
/// The caller is expected to exit right after this returns `Ok`, which is what
/// lets the operating system release the running binary so the installer can
/// replace it. Usually `self_path` and `target` are the same file.
///
/// # Errors
///
/// Propagates the spawner's error. The staging file is left alone; the caller
/// decides whether to discard it.
pub fn launch_installer(
    spawner: &dyn ProcessSpawner,
    staging: &Path,
    target: &Path,
    self_path: &Path,
) -> Result<u32> {
    let pid = spawner.spawn_detached(self_path, &installer_args(staging, target))?;
    info!("Installer started (pid {}), handing off {} -> {}", pid, staging.display(), target.display());
    Ok(pid)
}
