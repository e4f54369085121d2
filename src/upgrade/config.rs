use crate::constants::{
    DEFAULT_HTTP_TIMEOUT, DEFAULT_INSTALL_DELAY, DEFAULT_REPLACE_ATTEMPTS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration settings for nametag self-update behavior.
///
/// `UpgradeConfig` lives under the `[upgrade]` table of the global config file
/// and controls where updates come from, how long network requests may take,
/// and how patient the installer is with the file it replaces.
///
/// # Default Behavior
///
/// - No manifest URL: automatic checks are skipped until one is configured
/// - Check on every startup once a manifest URL is set
/// - 30 second connect and stall timeout for HTTP requests
/// - Installer waits one second, then makes up to five rename attempts
/// - Back up the running binary before it is deleted
/// - Any version string different from the running one is an update
///
/// ## TOML Example
/// ```toml
/// [upgrade]
/// manifest_url = "https://updates.example.com/latest.json"
/// check_on_startup = true
/// http_timeout_secs = 30
/// install_delay_ms = 1000
/// replace_attempts = 5
/// auto_backup = true
/// version_policy = "differs"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// URL of the JSON manifest describing the latest release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,

    /// Whether to run an update cycle when nametag starts without a subcommand.
    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,

    /// Connect timeout and the longest a manifest or binary response may
    /// stall without sending data, in seconds.
    ///
    /// `0` disables the timeout and leaves requests unbounded.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// How long the installer sleeps before touching the target file, in
    /// milliseconds.
    ///
    /// This gives the parent process time to exit and release its executable.
    /// The rename retry loop covers parents that take longer.
    #[serde(default = "default_install_delay_ms")]
    pub install_delay_ms: u64,

    /// Maximum number of rename attempts before falling back to copy.
    #[serde(default = "default_replace_attempts")]
    pub replace_attempts: u32,

    /// Whether the installer backs up the target before deleting it.
    ///
    /// The backup is restored if neither rename nor copy succeeds, and removed
    /// after a successful install.
    #[serde(default = "default_auto_backup")]
    pub auto_backup: bool,

    /// Directory for staging files. Defaults to the system temp directory.
    ///
    /// Placing it on the same filesystem as the executable keeps the
    /// replacement a single atomic rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// How the manifest version is compared with the running version.
    #[serde(default)]
    pub version_policy: VersionPolicy,
}

/// Rule deciding whether a manifest version counts as an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Any version string different from the running one is an update,
    /// including an older one.
    #[default]
    Differs,
    /// Only a semantically greater version is an update.
    Newer,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            manifest_url: None,
            check_on_startup: default_check_on_startup(),
            http_timeout_secs: default_http_timeout_secs(),
            install_delay_ms: default_install_delay_ms(),
            replace_attempts: default_replace_attempts(),
            auto_backup: default_auto_backup(),
            staging_dir: None,
            version_policy: VersionPolicy::default(),
        }
    }
}

const fn default_check_on_startup() -> bool {
    true
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT.as_secs()
}

const fn default_install_delay_ms() -> u64 {
    DEFAULT_INSTALL_DELAY.as_millis() as u64
}

const fn default_replace_attempts() -> u32 {
    DEFAULT_REPLACE_ATTEMPTS
}

const fn default_auto_backup() -> bool {
    true
}

impl UpgradeConfig {
    /// HTTP timeout, or `None` when disabled.
    #[must_use]
    pub const fn http_timeout(&self) -> Option<Duration> {
        if self.http_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.http_timeout_secs))
        }
    }

    /// Delay before the installer's first replace attempt.
    #[must_use]
    pub const fn install_delay(&self) -> Duration {
        Duration::from_millis(self.install_delay_ms)
    }

    /// Rename attempts, never less than one.
    #[must_use]
    pub fn replace_attempts(&self) -> u32 {
        self.replace_attempts.max(1)
    }

    /// Directory in which staging files are created.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Whether this is the default configuration.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
