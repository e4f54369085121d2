//! Global constants used throughout the nametag codebase.
//!
//! This module contains the version string, protocol flags, timeouts, and
//! retry parameters shared between the normal process and the installer
//! process. Both roles are the same executable, so both read these values
//! from the same place.

use std::time::Duration;

/// Version of the running binary, fixed at compile time.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Marker flag that selects installer mode at process start.
///
/// The running process passes this flag, followed by the staging path and the
/// target path, when it hands off to the installer.
pub const INSTALLER_FLAG: &str = "--update-install";

/// Prefix of staging files created by the downloader.
pub const STAGING_FILE_PREFIX: &str = "nametag-update-";

/// Suffix appended to the target file name for the pre-replace backup.
pub const BACKUP_SUFFIX: &str = ".backup";

/// User agent sent with manifest and binary requests.
pub const USER_AGENT: &str = concat!("nametag/", env!("CARGO_PKG_VERSION"), " (self-update)");

/// Default HTTP timeout applied to manifest and binary requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time the installer waits for the parent to exit before replacing.
pub const DEFAULT_INSTALL_DELAY: Duration = Duration::from_millis(1000);

/// Default number of rename attempts before falling back to copy.
pub const DEFAULT_REPLACE_ATTEMPTS: u32 = 5;

/// Starting delay between rename attempts.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 100;

/// Upper bound on the delay between rename attempts.
pub const MAX_BACKOFF_DELAY_MS: u64 = 2000;

/// Permission bits applied to staged and installed binaries on Unix.
#[cfg(unix)]
pub const EXECUTABLE_MODE: u32 = 0o755;
