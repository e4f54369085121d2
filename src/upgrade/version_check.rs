use crate::core::UpdateError;
use crate::upgrade::config::VersionPolicy;
use crate::utils::platform::Platform;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Release manifest published next to the binaries.
///
/// Fetched fresh for every check and never persisted. The wire format is a flat
/// JSON object with one URL field per platform family:
///
/// ```json
/// {
///   "version": "2.0.0",
///   "url_windows": "https://updates.example.com/nametag.exe",
///   "url_darwin": "https://updates.example.com/nametag-darwin",
///   "url_linux": "https://updates.example.com/nametag-linux"
/// }
/// ```
///
/// Missing URL fields decode as empty strings and are reported as
/// [`UpdateError::MissingPlatformUrl`] only if the running platform needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Version string of the published release.
    pub version: String,
    /// Download URL for Windows.
    #[serde(default)]
    pub url_windows: String,
    /// Download URL for macOS.
    #[serde(default)]
    pub url_darwin: String,
    /// Download URL for Linux and every other platform.
    #[serde(default)]
    pub url_linux: String,
}

impl Manifest {
    /// The download URL for `platform`, if the manifest lists one.
    #[must_use]
    pub fn url_for(&self, platform: Platform) -> Option<&str> {
        let url = match platform {
            Platform::Windows => &self.url_windows,
            Platform::Darwin => &self.url_darwin,
            Platform::Other => &self.url_linux,
        };
        let url = url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Like [`url_for`](Self::url_for), but a missing URL is an error.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::MissingPlatformUrl`] if the field is empty.
    pub fn download_url(&self, platform: Platform) -> Result<&str, UpdateError> {
        self.url_for(platform).ok_or_else(|| UpdateError::MissingPlatformUrl {
            platform: platform.to_string(),
        })
    }
}

/// Result of comparing the manifest with the running version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The manifest names the running version.
    UpToDate,
    /// The manifest names a version that counts as an update.
    Available(Manifest),
}

/// Fetches the release manifest and decides whether it is an update.
///
/// Under the default [`VersionPolicy::Differs`] any manifest version that is
/// not byte-for-byte equal to the running version is an update, so a server
/// publishing an older version also triggers a reinstall. [`VersionPolicy::Newer`]
/// narrows that to semantically greater versions.
///
/// # Examples
///
/// ```rust,no_run
/// use nametag_cli::upgrade::{UpdateCheck, VersionChecker};
/// use nametag_cli::upgrade::config::VersionPolicy;
///
/// # async fn example() -> anyhow::Result<()> {
/// let checker = VersionChecker::new(reqwest::Client::new(), VersionPolicy::Differs);
/// match checker.check_for_update("https://updates.example.com/latest.json", "1.0.0").await? {
///     UpdateCheck::Available(manifest) => println!("Update to {}", manifest.version),
///     UpdateCheck::UpToDate => println!("Up to date"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VersionChecker {
    client: reqwest::Client,
    policy: VersionPolicy,
}

impl VersionChecker {
    /// Create a checker using `client` for requests.
    #[must_use]
    pub const fn new(client: reqwest::Client, policy: VersionPolicy) -> Self {
        Self {
            client,
            policy,
        }
    }

    /// Fetch and decode the manifest with a single GET.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ManifestFetch`] if the request fails
    /// - [`UpdateError::HttpStatus`] on a non-success status
    /// - [`UpdateError::ManifestDecode`] if the body is not a manifest
    pub async fn fetch_manifest(&self, manifest_url: &str) -> Result<Manifest> {
        debug!("Fetching update manifest from {}", manifest_url);

        let response =
            self.client.get(manifest_url).send().await.map_err(|e| UpdateError::ManifestFetch {
                url: manifest_url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(UpdateError::HttpStatus {
                url: manifest_url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(|e| UpdateError::ManifestFetch {
            url: manifest_url.to_string(),
            reason: e.to_string(),
        })?;

        let manifest: Manifest =
            serde_json::from_slice(&body).map_err(|e| UpdateError::ManifestDecode {
                url: manifest_url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Manifest reports version {}", manifest.version);
        Ok(manifest)
    }

    /// Fetch the manifest and compare it with `current_version`.
    ///
    /// # Errors
    ///
    /// Propagates every [`fetch_manifest`](Self::fetch_manifest) error. The
    /// caller treats them as "no update this cycle".
    pub async fn check_for_update(
        &self,
        manifest_url: &str,
        current_version: &str,
    ) -> Result<UpdateCheck> {
        let manifest = self.fetch_manifest(manifest_url).await?;

        if Self::is_update(self.policy, current_version, &manifest.version) {
            info!("Update available: {} -> {}", current_version, manifest.version);
            Ok(UpdateCheck::Available(manifest))
        } else {
            debug!("Already on the latest version ({})", current_version);
            Ok(UpdateCheck::UpToDate)
        }
    }

    /// Decide whether `remote` is an update over `current` under `policy`.
    #[must_use]
    pub fn is_update(policy: VersionPolicy, current: &str, remote: &str) -> bool {
        match policy {
            VersionPolicy::Differs => remote != current,
            VersionPolicy::Newer => match (parse_version(current), parse_version(remote)) {
                (Some(current), Some(remote)) => remote > current,
                _ => {
                    warn!(
                        "Cannot compare '{}' and '{}' as semantic versions, treating any difference as an update",
                        current, remote
                    );
                    remote != current
                }
            },
        }
    }

    /// Human-readable status line for `nametag upgrade --check`.
    pub fn format_version_info(current: &str, latest: Option<&str>) -> String {
        match latest {
            Some(v) if v != current => {
                format!("Current version: {}\nLatest version:  {} (update available)", current, v)
            }
            _ => format!("Current version: {} (up to date)", current),
        }
    }
}

fn parse_version(version: &str) -> Option<semver::Version> {
    semver::Version::parse(version.trim().trim_start_matches('v')).ok()
}
