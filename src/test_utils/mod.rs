//! Test utilities for nametag
//!
//! Helpers shared by unit tests and the integration tests under `tests/`
//! (which reach them through the `test-utils` feature):
//! - one-time tracing setup that writes through the test harness
//! - a [`RecordingSpawner`] that records process launches instead of running them
//! - small fixtures for manifests and fake binaries
//!
//! # Example
//!
//! ```rust,no_run
//! use nametag_cli::test_utils::{RecordingSpawner, init_test_logging};
//!
//! init_test_logging(None);
//! let spawner = RecordingSpawner::new();
//! assert!(spawner.calls().is_empty());
//! ```

use crate::core::UpdateError;
use crate::upgrade::version_check::Manifest;
use crate::utils::ProcessSpawner;
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run silently.
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=nametag_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// One recorded call to [`ProcessSpawner::spawn_detached`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnCall {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

/// A [`ProcessSpawner`] that records invocations and never starts anything.
#[derive(Debug)]
pub struct RecordingSpawner {
    calls: Mutex<Vec<SpawnCall>>,
    fail: bool,
    pid: u32,
}

impl RecordingSpawner {
    /// Spawner that succeeds and reports a fixed fake pid.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
            pid: 4242,
        }
    }

    /// Spawner that records the call and then fails with `SpawnFailed`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<SpawnCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// The pid handed back on success.
    pub const fn pid(&self) -> u32 {
        self.pid
    }
}

impl Default for RecordingSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> Result<u32> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(SpawnCall {
                program: program.to_path_buf(),
                args: args.to_vec(),
            });
        }

        if self.fail {
            return Err(UpdateError::SpawnFailed {
                program: program.display().to_string(),
                reason: "spawning disabled in test".to_string(),
            }
            .into());
        }
        Ok(self.pid)
    }
}

/// Manifest announcing `version` with a distinct URL per platform under `base`.
pub fn manifest_for(version: &str, base: &str) -> Manifest {
    Manifest {
        version: version.to_string(),
        url_windows: format!("{base}/bin/windows"),
        url_darwin: format!("{base}/bin/darwin"),
        url_linux: format!("{base}/bin/linux"),
    }
}

/// Write `contents` to `path` as an executable file.
pub fn write_fake_binary(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
