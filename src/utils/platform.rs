//! Platform detection and platform-specific file helpers
//!
//! The update manifest lists one download URL per platform family. This module
//! maps the compile-time target OS onto those families and hides the
//! differences in how executables are marked runnable.
//!
//! | Target OS | [`Platform`] | Manifest field |
//! |-----------|--------------|----------------|
//! | `windows` | `Windows` | `url_windows` |
//! | `macos` | `Darwin` | `url_darwin` |
//! | anything else | `Other` | `url_linux` |
//!
//! # Examples
//!
//! ```rust,no_run
//! use nametag_cli::utils::platform::Platform;
//!
//! let platform = Platform::current();
//! println!("Running on {platform}");
//! ```

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Platform family used to select a download URL from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Microsoft Windows
    Windows,
    /// Apple macOS
    Darwin,
    /// Linux and every other OS; served the Linux binary
    Other,
}

impl Platform {
    /// Detect the platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier (as in [`std::env::consts::OS`]) to a platform.
    ///
    /// Both `macos` and `darwin` map to [`Platform::Darwin`]; any
    /// unrecognised identifier maps to [`Platform::Other`].
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" | "darwin" => Self::Darwin,
            _ => Self::Other,
        }
    }

    /// Identifier used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Darwin => "darwin",
            Self::Other => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `true` when compiled for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Get the current user's home directory.
///
/// # Errors
///
/// Fails when the OS does not report a home directory (missing `HOME` or
/// `USERPROFILE`).
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Mark a file as executable.
///
/// Sets mode `0o755` on Unix. On platforms without executable permission
/// bits this succeeds without touching the file.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
pub async fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(crate::constants::EXECUTABLE_MODE);
        tokio::fs::set_permissions(path, perms)
            .await
            .with_context(|| format!("Failed to set executable permission on {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        tracing::debug!(
            "Executable permission bits not supported here, skipping for {}",
            path.display()
        );
    }

    Ok(())
}

/// Check whether a file carries the owner-executable bit.
///
/// Always `true` on platforms without permission bits.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).map(|m| m.permissions().mode() & 0o100 != 0).unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
