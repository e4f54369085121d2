//! Error handling for nametag
//!
//! This module provides the error types and user-friendly error reporting for the
//! self-update flow. The error system follows two principles:
//! 1. **Strongly-typed errors** for the discrete failure points of an update cycle
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated error types for every failure point in the update flow
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Module functions return [`anyhow::Result`] and attach context with
//! [`anyhow::Context`]. Where a failure has a well-known cause (a bad HTTP status,
//! a manifest without a URL for this platform, a failed spawn) the innermost error
//! is an [`UpdateError`], so [`user_friendly_error`] can find it by walking the
//! error chain.
//!
//! # Severity
//!
//! Most of these errors are *soft*: the orchestrator logs them and the program
//! continues with its normal work. Only [`UpdateError::ReplaceFailed`] raised
//! inside the installer and [`UpdateError::InstallUsage`] terminate the process
//! with a non-zero exit code.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nametag_cli::core::{ErrorContext, UpdateError, user_friendly_error};
//!
//! let error = UpdateError::HttpStatus {
//!     url: "https://example.com/latest.json".to_string(),
//!     status: 404,
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for nametag update operations.
///
/// Each variant carries the data needed to explain the failure to a user.
/// Use [`user_friendly_error`] to turn any [`anyhow::Error`] carrying one of
/// these into an [`ErrorContext`] with suggestions.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The manifest request could not be sent or completed.
    #[error("Failed to fetch update manifest from {url}")]
    ManifestFetch {
        /// Manifest URL that was requested
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// A request completed with a non-success HTTP status.
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// The manifest body was not a valid manifest document.
    #[error("Malformed update manifest from {url}")]
    ManifestDecode {
        /// Manifest URL that was requested
        url: String,
        /// Decoder error
        reason: String,
    },

    /// The manifest has no download URL for the running platform.
    #[error("Update manifest has no download URL for platform '{platform}'")]
    MissingPlatformUrl {
        /// Platform identifier (`windows`, `darwin`, `linux`)
        platform: String,
    },

    /// The binary download request could not be sent or completed.
    #[error("Failed to download {url}")]
    DownloadFailed {
        /// Binary URL that was requested
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// The binary could not be written completely to the staging file.
    #[error("Failed to write staging file {path}")]
    StagingWrite {
        /// Staging file path (or staging directory if the file was never created)
        path: String,
        /// Underlying error
        reason: String,
    },

    /// A detached child process could not be started.
    #[error("Failed to start process {program}")]
    SpawnFailed {
        /// Executable that was launched
        program: String,
        /// Underlying error
        reason: String,
    },

    /// Neither rename nor fallback copy could put the new binary in place.
    #[error("Failed to replace {target} with the downloaded binary")]
    ReplaceFailed {
        /// Target executable path
        target: String,
        /// Last error observed
        reason: String,
    },

    /// Installer mode was invoked without both positional arguments.
    #[error("Installer mode requires <staging> and <target> arguments, got {found}")]
    InstallUsage {
        /// Number of positional arguments actually supplied
        found: usize,
    },

    /// Rollback was requested but no backup exists.
    #[error("No backup found at {path}")]
    BackupNotFound {
        /// Expected backup path
        path: String,
    },

    /// No manifest URL was configured or supplied.
    #[error("No update manifest URL configured")]
    ManifestUrlMissing,

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Catch-all.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Error wrapper with a suggestion and extra details for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-facing [`ErrorContext`].
///
/// Walks the error chain looking for an [`UpdateError`]; the first one found
/// decides the suggestion. Errors without one are reported with the full
/// chain as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut current: &dyn std::error::Error = error.as_ref();
    loop {
        if let Some(update_error) = current.downcast_ref::<UpdateError>() {
            let ctx = create_error_context(update_error);
            return if ctx.details.is_none() {
                ctx.with_details(format!("{error:#}"))
            } else {
                ctx
            };
        }

        match current.source() {
            Some(source) => current = source,
            None => break,
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(UpdateError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check file permissions on the nametag executable and its directory");
    }

    ErrorContext::new(UpdateError::Other {
        message: error.to_string(),
    })
    .with_details(format!("{error:#}"))
}

fn create_error_context(error: &UpdateError) -> ErrorContext {
    let rebuilt = rebuild(error);
    match error {
        UpdateError::ManifestFetch {
            reason,
            ..
        } => ErrorContext::new(rebuilt)
            .with_details(reason.clone())
            .with_suggestion("Check your network connection and the configured manifest URL"),
        UpdateError::HttpStatus {
            status,
            ..
        } if *status == 404 => ErrorContext::new(rebuilt)
            .with_suggestion("The update server does not have this file; check `upgrade.manifest_url`"),
        UpdateError::HttpStatus {
            ..
        } => ErrorContext::new(rebuilt).with_suggestion("The update server may be unavailable; try again later"),
        UpdateError::ManifestDecode {
            reason,
            ..
        } => ErrorContext::new(rebuilt).with_details(reason.clone()).with_suggestion(
            "The manifest must be JSON with `version`, `url_windows`, `url_darwin` and `url_linux` fields",
        ),
        UpdateError::MissingPlatformUrl {
            ..
        } => ErrorContext::new(rebuilt)
            .with_suggestion("Publish a binary for this platform and list it in the manifest"),
        UpdateError::DownloadFailed {
            reason,
            ..
        } => ErrorContext::new(rebuilt)
            .with_details(reason.clone())
            .with_suggestion("Check your network connection; the update will be retried next start"),
        UpdateError::StagingWrite {
            reason,
            ..
        } => ErrorContext::new(rebuilt)
            .with_details(reason.clone())
            .with_suggestion("Check free disk space and `upgrade.staging_dir` permissions"),
        UpdateError::SpawnFailed {
            reason,
            ..
        } => ErrorContext::new(rebuilt).with_details(reason.clone()),
        UpdateError::ReplaceFailed {
            target,
            reason,
        } => ErrorContext::new(rebuilt).with_details(reason.clone()).with_suggestion(format!(
            "Reinstall nametag manually; a backup may exist at {target}.backup"
        )),
        UpdateError::InstallUsage {
            ..
        } => ErrorContext::new(rebuilt)
            .with_suggestion("Installer mode is internal; run `nametag upgrade` instead"),
        UpdateError::BackupNotFound {
            ..
        } => ErrorContext::new(rebuilt)
            .with_suggestion("Backups are only kept when an install fails and cannot be restored"),
        UpdateError::ManifestUrlMissing => ErrorContext::new(rebuilt).with_suggestion(
            "Set `manifest_url` under [upgrade] in the config file or pass --manifest-url",
        ),
        UpdateError::TomlError(_) => ErrorContext::new(rebuilt)
            .with_suggestion("Run `nametag config path` to locate the config file and fix it"),
        UpdateError::IoError(_)
        | UpdateError::Other {
            ..
        } => ErrorContext::new(rebuilt),
    }
}

// Errors wrapping foreign types are not Clone; keep their message instead.
fn rebuild(error: &UpdateError) -> UpdateError {
    match error {
        UpdateError::ManifestFetch {
            url,
            reason,
        } => UpdateError::ManifestFetch {
            url: url.clone(),
            reason: reason.clone(),
        },
        UpdateError::HttpStatus {
            url,
            status,
        } => UpdateError::HttpStatus {
            url: url.clone(),
            status: *status,
        },
        UpdateError::ManifestDecode {
            url,
            reason,
        } => UpdateError::ManifestDecode {
            url: url.clone(),
            reason: reason.clone(),
        },
        UpdateError::MissingPlatformUrl {
            platform,
        } => UpdateError::MissingPlatformUrl {
            platform: platform.clone(),
        },
        UpdateError::DownloadFailed {
            url,
            reason,
        } => UpdateError::DownloadFailed {
            url: url.clone(),
            reason: reason.clone(),
        },
        UpdateError::StagingWrite {
            path,
            reason,
        } => UpdateError::StagingWrite {
            path: path.clone(),
            reason: reason.clone(),
        },
        UpdateError::SpawnFailed {
            program,
            reason,
        } => UpdateError::SpawnFailed {
            program: program.clone(),
            reason: reason.clone(),
        },
        UpdateError::ReplaceFailed {
            target,
            reason,
        } => UpdateError::ReplaceFailed {
            target: target.clone(),
            reason: reason.clone(),
        },
        UpdateError::InstallUsage {
            found,
        } => UpdateError::InstallUsage {
            found: *found,
        },
        UpdateError::BackupNotFound {
            path,
        } => UpdateError::BackupNotFound {
            path: path.clone(),
        },
        UpdateError::ManifestUrlMissing => UpdateError::ManifestUrlMissing,
        other => UpdateError::Other {
            message: other.to_string(),
        },
    }
}
