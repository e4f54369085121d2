//! `nametag config`: inspect the configuration file.

use crate::config::GlobalConfig;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Print the effective configuration, defaults included.
    Show,

    /// Print the location of the configuration file.
    Path,
}

impl ConfigCommand {
    /// Run the subcommand against the already loaded `config`.
    ///
    /// # Errors
    ///
    /// Fails if the config path cannot be determined or the configuration
    /// cannot be rendered.
    pub fn execute(self, config: &GlobalConfig, config_path: Option<PathBuf>) -> Result<()> {
        let config_path = match config_path {
            Some(path) => path,
            None => GlobalConfig::default_path()?,
        };

        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(config, &config_path),
            Some(ConfigSubcommands::Path) => {
                Self::show_path(&config_path);
                Ok(())
            }
        }
    }

    fn show(config: &GlobalConfig, config_path: &std::path::Path) -> Result<()> {
        println!("{}", "Configuration".bold());
        if config_path.exists() {
            println!("Location: {}\n", config_path.display());
        } else {
            println!("Location: {} {}\n", config_path.display(), "(not found, using defaults)".yellow());
        }
        println!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn show_path(config_path: &std::path::Path) {
        println!("{}", config_path.display());
    }
}
