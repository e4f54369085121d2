use crate::constants::{CURRENT_VERSION, USER_AGENT};
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::download::Downloader;
use crate::upgrade::launcher::launch_installer;
use crate::upgrade::version_check::{UpdateCheck, VersionChecker};
use crate::utils::platform::Platform;
use crate::utils::{DetachedSpawner, ProcessSpawner};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one check-and-update cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The manifest names the running version.
    UpToDate,
    /// Something went wrong before the handoff; the running binary is untouched.
    Skipped {
        /// Formatted error chain.
        reason: String,
    },
    /// The installer is running. The caller must exit now.
    HandedOff {
        /// Process id of the installer.
        installer_pid: u32,
        /// Staging file the installer will move into place.
        staging: PathBuf,
    },
}

/// Drives the update cycle: check the manifest, download the new binary, hand
/// off to the installer.
///
/// Every failure before the handoff is soft. [`check_and_update`](Self::check_and_update)
/// logs it, returns [`UpdateOutcome::Skipped`], and the program carries on with
/// the version it already has. Only a successful handoff changes control flow:
/// the caller must exit so the installer can replace the binary.
///
/// # Examples
///
/// ```rust,no_run
/// use nametag_cli::upgrade::{UpdateOutcome, Updater};
/// use nametag_cli::upgrade::config::UpgradeConfig;
///
/// # async fn example() -> anyhow::Result<()> {
/// let updater = Updater::for_current_exe(&UpgradeConfig::default())?;
/// if let UpdateOutcome::HandedOff { .. } =
///     updater.check_and_update("https://updates.example.com/latest.json").await
/// {
///     std::process::exit(0);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Updater {
    checker: VersionChecker,
    downloader: Downloader,
    spawner: Arc<dyn ProcessSpawner>,
    current_version: String,
    platform: Platform,
    target: PathBuf,
    self_path: PathBuf,
}

impl Updater {
    /// Updater for the executable at `target`, which is also the program
    /// started in installer mode.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &UpgradeConfig, target: PathBuf) -> Result<Self> {
        let client = build_http_client(config.http_timeout())?;
        Ok(Self {
            checker: VersionChecker::new(client.clone(), config.version_policy),
            downloader: Downloader::new(client, config.staging_dir()),
            spawner: Arc::new(DetachedSpawner::default()),
            current_version: CURRENT_VERSION.to_string(),
            platform: Platform::current(),
            self_path: target.clone(),
            target,
        })
    }

    /// Updater for the running executable.
    ///
    /// # Errors
    ///
    /// Fails if the path of the running executable cannot be determined.
    pub fn for_current_exe(config: &UpgradeConfig) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        debug!("Running executable: {}", exe.display());
        Self::new(config, exe)
    }

    /// Use `spawner` to start the installer.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Pick download URLs for `platform` instead of the build platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Compare manifests against `version` instead of the built-in version.
    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Start installer mode through `self_path` rather than the target itself.
    #[must_use]
    pub fn with_self_path(mut self, self_path: PathBuf) -> Self {
        self.self_path = self_path;
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Fetch the manifest and compare it, without downloading anything.
    ///
    /// # Errors
    ///
    /// Propagates manifest fetch and decode errors.
    pub async fn check(&self, manifest_url: &str) -> Result<UpdateCheck> {
        self.checker.check_for_update(manifest_url, &self.current_version).await
    }

    /// Run one full cycle against `manifest_url`.
    ///
    /// Never fails: errors become [`UpdateOutcome::Skipped`]. A staging file
    /// whose installer could not be started is deleted.
    pub async fn check_and_update(&self, manifest_url: &str) -> UpdateOutcome {
        let manifest = match self.check(manifest_url).await {
            Ok(UpdateCheck::UpToDate) => return UpdateOutcome::UpToDate,
            Ok(UpdateCheck::Available(manifest)) => manifest,
            Err(e) => return skip("Update check failed", &e),
        };

        let url = match manifest.download_url(self.platform) {
            Ok(url) => url,
            Err(e) => return skip("Update check failed", &anyhow::Error::from(e)),
        };

        let staged = match self.downloader.fetch_binary(url).await {
            Ok(staged) => staged,
            Err(e) => return skip("Download failed", &e),
        };

        match launch_installer(self.spawner.as_ref(), staged.path(), &self.target, &self.self_path) {
            Ok(installer_pid) => {
                info!("Handing off to installer for version {}", manifest.version);
                UpdateOutcome::HandedOff {
                    installer_pid,
                    staging: staged.path().to_path_buf(),
                }
            }
            Err(e) => {
                let outcome = skip("Could not start installer", &e);
                staged.discard().await;
                outcome
            }
        }
    }
}

fn skip(what: &str, error: &anyhow::Error) -> UpdateOutcome {
    warn!("{}, continuing with the current version: {:#}", what, error);
    UpdateOutcome::Skipped {
        reason: format!("{error:#}"),
    }
}

/// HTTP client shared by the manifest and binary requests.
///
/// `timeout` bounds connecting and each wait for data, not the whole
/// transfer, so a large binary on a slow link still completes.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.connect_timeout(timeout).read_timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}
