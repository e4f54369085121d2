//! Streaming download of release binaries into staging files.

use crate::constants::STAGING_FILE_PREFIX;
use crate::core::UpdateError;
use crate::utils::platform::set_executable;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// A downloaded binary, fully written, synced, and closed.
///
/// Nothing hands out a `StagedBinary` until the whole response body is on
/// disk, so holding one means the file is safe to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBinary {
    path: PathBuf,
    size: u64,
}

impl StagedBinary {
    /// Path of the staging file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Delete the staging file. Used when the handoff is abandoned.
    pub async fn discard(self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed staging file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging file {}: {}", self.path.display(), e),
        }
    }
}

/// Downloads release binaries into uniquely-named staging files.
///
/// The body is streamed chunk by chunk, so large binaries are never held in
/// memory. Until the file is complete it is owned by a [`tempfile::TempPath`],
/// which deletes it on drop: any error along the way leaves nothing behind.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    staging_dir: PathBuf,
}

impl Downloader {
    /// Create a downloader writing into `staging_dir`.
    #[must_use]
    pub const fn new(client: reqwest::Client, staging_dir: PathBuf) -> Self {
        Self {
            client,
            staging_dir,
        }
    }

    /// Download `url` into a new staging file and mark it executable.
    ///
    /// Failing to set the executable bit is logged and ignored; the installer
    /// sets it again on the target.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::DownloadFailed`] if the request or body stream fails
    /// - [`UpdateError::HttpStatus`] on a non-success status
    /// - [`UpdateError::StagingWrite`] if the staging file cannot be written
    pub async fn fetch_binary(&self, url: &str) -> Result<StagedBinary> {
        info!("Downloading update from {}", url);

        let download_failed = |e: reqwest::Error| UpdateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut response = self.client.get(url).send().await.map_err(download_failed)?;

        if !response.status().is_success() {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let staging_write = |path: &Path, e: std::io::Error| UpdateError::StagingWrite {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| staging_write(&self.staging_dir, e))?;

        let named = tempfile::Builder::new()
            .prefix(STAGING_FILE_PREFIX)
            .tempfile_in(&self.staging_dir)
            .map_err(|e| staging_write(&self.staging_dir, e))?;
        let (file, temp_path) = named.into_parts();
        debug!("Staging download at {}", temp_path.display());

        let mut file = tokio::fs::File::from_std(file);
        let mut size: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(download_failed)? {
            file.write_all(&chunk).await.map_err(|e| staging_write(&temp_path, e))?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| staging_write(&temp_path, e))?;
        file.sync_all().await.map_err(|e| staging_write(&temp_path, e))?;
        drop(file);

        if let Err(e) = set_executable(&temp_path).await {
            warn!("{:#}", e);
        }

        let path = temp_path.keep().map_err(|e| UpdateError::StagingWrite {
            path: e.path.display().to_string(),
            reason: e.error.to_string(),
        })?;

        info!("Downloaded {} bytes to {}", size, path.display());
        Ok(StagedBinary {
            path,
            size,
        })
    }
}
