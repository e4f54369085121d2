//! Command-line interface for nametag.
//!
//! One executable plays two roles, picked once from argv before anything else
//! runs (see [`RunMode`]):
//!
//! - **Normal mode**: the everyday program. With no subcommand it runs the
//!   startup update cycle and then greets the user; `upgrade` and `config`
//!   are explicit commands.
//! - **Installer mode**: `nametag --update-install <staging> <target>`, started
//!   by a running nametag during an update. It replaces the target, relaunches
//!   it, and exits without touching any normal-mode logic. The flag is hidden
//!   from `--help`.
//!
//! # Examples
//!
//! ```bash
//! nametag                         # check for updates, then run
//! nametag upgrade --check         # report whether an update exists
//! nametag upgrade                 # update now
//! nametag upgrade --rollback      # restore nametag.backup
//! nametag config show             # print the effective configuration
//! nametag --config ./dev.toml     # use another config file
//! ```

pub mod config;
pub mod upgrade;

use crate::config::{CONFIG_PATH_ENV, GlobalConfig};
use crate::constants::CURRENT_VERSION;
use crate::core::UpdateError;
use crate::upgrade::{InstallRequest, Installer, UpdateOutcome, Updater};
use crate::utils::DetachedSpawner;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// How the process continues after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Work is finished; return from `main` normally.
    Done,
    /// An installer was started for this executable; exit with code 0 right
    /// away so it can replace the binary.
    HandedOff,
}

/// Role of this process, decided from argv at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Regular program behaviour.
    Normal,
    /// Installer mode with both paths present.
    Install(InstallRequest),
    /// Installer mode with missing paths. Nothing is touched; the process
    /// exits non-zero.
    InstallUsage {
        /// Number of paths supplied.
        found: usize,
    },
}

/// Self-updating nametag executable.
#[derive(Parser, Debug)]
#[command(name = "nametag", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.nametag/config.toml).
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Installer mode: replace <TARGET> with <STAGING> and relaunch it.
    #[arg(long = "update-install", hide = true, num_args = 0..=2, value_names = ["STAGING", "TARGET"])]
    update_install: Option<Vec<PathBuf>>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for a new version and install it.
    Upgrade(upgrade::UpgradeArgs),

    /// Inspect the configuration.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Role selected by the command line.
    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        match &self.update_install {
            None => RunMode::Normal,
            Some(args) => match InstallRequest::from_args(args) {
                Ok(request) => RunMode::Install(request),
                Err(_) => RunMode::InstallUsage {
                    found: args.len(),
                },
            },
        }
    }

    /// Log level implied by `--verbose` / `--quiet`.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the command-line flags.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_level()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Run whichever role argv selected.
    ///
    /// # Errors
    ///
    /// Returns the error of the selected command. In installer mode this is
    /// [`UpdateError::InstallUsage`] or [`UpdateError::ReplaceFailed`].
    pub async fn execute(self) -> Result<Flow> {
        match self.run_mode() {
            RunMode::InstallUsage {
                found,
            } => {
                error!("usage: nametag --update-install <staging> <target>");
                Err(UpdateError::InstallUsage {
                    found,
                }
                .into())
            }
            RunMode::Install(request) => {
                let config = GlobalConfig::load_or_default(self.config.clone()).await;
                let installer = Installer::new(config.upgrade, Arc::new(DetachedSpawner::default()));
                installer.run(&request).await?;
                Ok(Flow::Done)
            }
            RunMode::Normal => {
                let config = GlobalConfig::load_with_optional(self.config.clone()).await?;
                match self.command {
                    Some(Commands::Upgrade(args)) => upgrade::execute(args, &config, self.config.as_deref()).await,
                    Some(Commands::Config(cmd)) => {
                        cmd.execute(&config, self.config)?;
                        Ok(Flow::Done)
                    }
                    None => run_default(&config, self.config.as_deref()).await,
                }
            }
        }
    }
}

/// Spawner for the installer. An explicit `--config` is forwarded through the
/// environment so the installer reads the same file.
pub(crate) fn installer_spawner(config_path: Option<&std::path::Path>) -> DetachedSpawner {
    match config_path {
        Some(path) => DetachedSpawner::default().env(CONFIG_PATH_ENV, path),
        None => DetachedSpawner::default(),
    }
}

async fn run_default(config: &GlobalConfig, config_path: Option<&std::path::Path>) -> Result<Flow> {
    if config.upgrade.check_on_startup
        && let Some(url) = config.upgrade.manifest_url.as_deref()
    {
        match Updater::for_current_exe(&config.upgrade) {
            Ok(updater) => {
                let updater = updater.with_spawner(Arc::new(installer_spawner(config_path)));
                if let UpdateOutcome::HandedOff {
                    ..
                } = updater.check_and_update(url).await
                {
                    return Ok(Flow::HandedOff);
                }
            }
            Err(e) => warn!("Skipping update check: {:#}", e),
        }
    } else {
        debug!("Startup update check disabled or no manifest URL configured");
    }

    println!("Hello! I am version {}", CURRENT_VERSION);
    Ok(Flow::Done)
}
