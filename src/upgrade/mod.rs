//! Self-update for nametag.
//!
//! The running binary cannot overwrite itself on every platform, so an update
//! is split across two processes that run the same executable:
//!
//! ```text
//! running nametag                         nametag --update-install <staging> <target>
//! ---------------                         -------------------------------------------
//! 1. GET manifest, compare versions
//! 2. GET platform binary -> staging file
//! 3. spawn installer, exit 0  ----------> 4. wait for the parent to exit
//!                                         5. back up target
//!                                         6. rename staging -> target (retry, then copy)
//!                                         7. chmod 0755, drop backup
//!                                         8. relaunch target, exit 0
//! ```
//!
//! Steps 1 to 3 are soft: any failure is logged and the program keeps running
//! the version it has. Step 6 is the only hard failure; the installer restores
//! the backup and exits non-zero.
//!
//! # Module Structure
//!
//! - [`version_check`]: manifest fetch and version comparison
//! - [`download`]: streaming download into staging files
//! - [`launcher`]: starting the installer process
//! - [`installer`]: the installer-mode state machine
//! - [`backup`]: target backup and restore
//! - [`config`]: the `[upgrade]` configuration table
//!
//! The downloaded binary is not checked against a checksum or signature.
//! Whatever the manifest URL serves is installed.

pub mod backup;
pub mod config;
pub mod download;
pub mod installer;
pub mod launcher;
mod self_updater;
pub mod version_check;

pub use download::{Downloader, StagedBinary};
pub use installer::{InstallReport, InstallRequest, InstallState, Installer, ReplaceStrategy};
pub use launcher::launch_installer;
pub use self_updater::{UpdateOutcome, Updater, build_http_client};
pub use version_check::{Manifest, UpdateCheck, VersionChecker};
