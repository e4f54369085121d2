//! Detached process spawning
//!
//! Both sides of the self-update handoff start a process and walk away from it:
//! the running program starts the installer and exits, and the installer starts
//! the freshly installed binary and exits. [`ProcessSpawner`] is the seam for
//! that operation so the orchestration can be exercised without launching real
//! processes.

use crate::core::UpdateError;
use anyhow::Result;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Starts a process without waiting for it.
pub trait ProcessSpawner: Send + Sync {
    /// Start `program` with `args`, inheriting stdout and stderr.
    ///
    /// Returns the child's process id. The child must not be waited on or
    /// killed when the handle goes away.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::SpawnFailed`] if the process cannot be started.
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> Result<u32>;
}

/// Real spawner backed by [`std::process::Command`].
///
/// On Unix the child is moved into its own process group so a terminal
/// interrupt aimed at the parent does not reach it. On Windows the child gets a
/// new process group for the same reason. Output streams stay attached so the
/// installer's log lines show up where the user started the program.
///
/// Children inherit the parent's environment plus any variables added with
/// [`env`](Self::env).
#[derive(Debug, Default, Clone)]
pub struct DetachedSpawner {
    envs: Vec<(OsString, OsString)>,
}

impl DetachedSpawner {
    /// Set `key` to `value` in every spawned child's environment.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl ProcessSpawner for DetachedSpawner {
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> Result<u32> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        // Dropping a std Child neither waits nor kills.
        let child = cmd.spawn().map_err(|e| UpdateError::SpawnFailed {
            program: program.display().to_string(),
            reason: e.to_string(),
        })?;

        let pid = child.id();
        debug!("Spawned detached process {} (pid {})", program.display(), pid);
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_spawn_missing_program_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let err = DetachedSpawner::default().spawn_detached(&missing, &[]).unwrap_err();
        let update_err = err.downcast_ref::<UpdateError>().unwrap();
        assert!(matches!(update_err, UpdateError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_real_program() {
        let pid = DetachedSpawner::default()
            .spawn_detached(Path::new("/bin/sh"), &["-c".into(), "exit 0".into()])
            .unwrap();
        assert!(pid > 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_passes_extra_env() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let script = format!("printf %s \"$NAMETAG_TEST_VALUE\" > '{}'", out.display());

        DetachedSpawner::default()
            .env("NAMETAG_TEST_VALUE", "from-parent")
            .spawn_detached(Path::new("/bin/sh"), &["-c".into(), script.into()])
            .unwrap();

        // The child is not waited on; poll for its output.
        for _ in 0..50 {
            if std::fs::read_to_string(&out).is_ok_and(|s| s == "from-parent") {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        panic!("child did not see the extra environment variable");
    }
}
