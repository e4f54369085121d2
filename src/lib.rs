//! nametag - a self-updating command-line executable
//!
//! nametag checks a remote manifest for a new release, downloads the binary
//! for the current platform, and replaces its own executable while it is
//! running. The replacement is done by a second copy of the same program
//! started in installer mode, after the original process has exited.
//!
//! # Architecture Overview
//!
//! ```text
//! VersionChecker -> Downloader -> launch_installer -> exit(0)
//!                                        |
//!                                        v
//!                     nametag --update-install <staging> <target>
//!                     Wait -> Replace -> Permission -> Relaunch -> Done
//! ```
//!
//! # Core Modules
//!
//! - [`cli`] - argument parsing, run-mode selection, and commands
//! - [`upgrade`] - manifest check, download, handoff, and the installer
//! - [`config`] - the user configuration file (`~/.nametag/config.toml`)
//! - [`core`] - error types and user-facing error formatting
//! - [`utils`] - platform detection, permissions, and detached processes
//! - [`constants`] - shared constants
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "version": "2.0.0",
//!   "url_windows": "https://updates.example.com/nametag.exe",
//!   "url_darwin": "https://updates.example.com/nametag-darwin",
//!   "url_linux": "https://updates.example.com/nametag-linux"
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [upgrade]
//! manifest_url = "https://updates.example.com/latest.json"
//! check_on_startup = true
//! version_policy = "differs"   # or "newer"
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
