//! Global configuration management for nametag.
//!
//! This module handles the user configuration file (`~/.nametag/config.toml`)
//! which tells nametag where its update manifest lives and how the installer
//! should behave.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.nametag/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\nametag\config.toml`
//!
//! The location can be overridden using the `NAMETAG_CONFIG_PATH` environment
//! variable or the global `--config` flag. The installer process inherits the
//! environment of the process that launched it, so an override set for the
//! parent also applies to the installer.
//!
//! # File Format
//!
//! ```toml
//! [upgrade]
//! manifest_url = "https://updates.example.com/latest.json"
//! install_delay_ms = 1000
//! ```
//!
//! A missing file is not an error; every setting has a default.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nametag_cli::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! if let Some(url) = &config.upgrade.manifest_url {
//!     println!("Updates come from {url}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::core::UpdateError;
use crate::upgrade::config::UpgradeConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "NAMETAG_CONFIG_PATH";

/// Global configuration for nametag.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Self-update settings from the `[upgrade]` table.
    #[serde(default, skip_serializing_if = "UpgradeConfig::is_default")]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load the configuration from the default location.
    ///
    /// Returns the default configuration if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from_if_exists(&path).await
    }

    /// Load from an explicit path, or from the default location when `None`.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_if_exists(&path).await,
            None => Self::load().await,
        }
    }

    /// Like [`load_with_optional`](Self::load_with_optional), but falls back to
    /// defaults with a warning instead of failing.
    ///
    /// The installer uses this: a broken config file must not stop it from
    /// finishing a replacement the parent has already committed to.
    pub async fn load_or_default(path: Option<PathBuf>) -> Self {
        match Self::load_with_optional(path).await {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring unreadable config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .map_err(UpdateError::from)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    async fn load_from_if_exists(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            Self::load_from(path).await
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Render the effective configuration as TOML, including defaults.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Effective<'a> {
            upgrade: &'a UpgradeConfig,
        }

        toml::to_string_pretty(&Effective {
            upgrade: &self.upgrade,
        })
        .context("Failed to serialize global config")
    }

    /// Get the config file path, honouring `NAMETAG_CONFIG_PATH`.
    ///
    /// # Errors
    ///
    /// Fails if no home (or local data) directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("nametag")
        } else {
            crate::utils::get_home_dir()?.join(".nametag")
        };

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::config::VersionPolicy;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            GlobalConfig::load_with_optional(Some(temp_dir.path().join("none.toml"))).await.unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn test_shown_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = GlobalConfig::default();
        config.upgrade.manifest_url = Some("http://h/latest.json".to_string());
        config.upgrade.version_policy = VersionPolicy::Newer;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_invalid_toml_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[upgrade\nmanifest_url = ").unwrap();

        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse global config"));
        assert!(err.chain().any(|e| e.downcast_ref::<UpdateError>().is_some()));
    }

    #[tokio::test]
    async fn test_load_or_default_swallows_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let config = GlobalConfig::load_or_default(Some(path)).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn test_effective_toml_includes_defaults() {
        let rendered = GlobalConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("[upgrade]"));
        assert!(rendered.contains("install_delay_ms = 1000"));
        assert!(rendered.contains("version_policy = \"differs\""));
    }

    #[test]
    #[serial]
    fn test_default_path_env_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom = temp_dir.path().join("custom.toml");

        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &custom);
        }
        let path = GlobalConfig::default_path().unwrap();
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }

        assert_eq!(path, custom);
    }

    #[test]
    #[serial]
    fn test_default_path_location() {
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = GlobalConfig::default_path().unwrap();
        assert!(path.ends_with("config.toml"));

        #[cfg(not(windows))]
        assert!(path.to_string_lossy().contains(".nametag"));
    }
}
