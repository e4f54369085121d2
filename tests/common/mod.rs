//! Shared helpers for the nametag integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use assert_cmd::Command;
use nametag_cli::config::CONFIG_PATH_ENV;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated home directory with its own config file.
pub struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        nametag_cli::test_utils::init_test_logging(None);
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".nametag").join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    /// Environment whose config contains `toml`.
    pub fn with_config(toml: &str) -> Self {
        let env = Self::new();
        env.write_config(toml);
        env
    }

    pub fn write_config(&self, toml: &str) {
        std::fs::create_dir_all(self.config_path.parent().unwrap()).unwrap();
        std::fs::write(&self.config_path, toml).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// `nametag` command isolated to this environment.
    pub fn nametag_command(&self) -> Command {
        let mut cmd = Command::cargo_bin("nametag").unwrap();
        cmd.env(CONFIG_PATH_ENV, &self.config_path)
            .env("HOME", self.temp_dir.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}
