//! nametag CLI entry point
//!
//! Parses the command line, sets up logging, and runs either normal mode or
//! installer mode. Errors are shown with [`user_friendly_error`] and exit with
//! code 1. After a successful handoff to the installer the process exits with
//! code 0 immediately so the binary can be replaced.

use anyhow::Result;
use clap::Parser;
use nametag_cli::cli::{Cli, Flow};
use nametag_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(Flow::Done) => Ok(()),
        Ok(Flow::HandedOff) => std::process::exit(0),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
