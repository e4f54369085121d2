//! Configuration management for nametag
//!
//! nametag reads a single user-level TOML file. See [`GlobalConfig`] for its
//! location and format, and [`crate::upgrade::config::UpgradeConfig`] for the
//! settings of the `[upgrade]` table.

mod global;

pub use global::{CONFIG_PATH_ENV, GlobalConfig};
