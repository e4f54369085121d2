//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`platform`] - Platform detection, home directory lookup, executable bits
//! - [`process`] - Detached process spawning for the update handoff

pub mod platform;
pub mod process;

pub use platform::{Platform, get_home_dir, is_windows, set_executable};
pub use process::{DetachedSpawner, ProcessSpawner};
