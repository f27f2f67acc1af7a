//! taskvault - authenticated to-do list client.
//!
//! # Examples
//!
//! ```bash
//! # Sign in (password prompted, or TASKVAULT_PASSWORD)
//! taskvault sign-in --email a@x.com
//!
//! # Add and list tasks
//! taskvault add Buy milk
//! taskvault list
//!
//! # Interactive session
//! taskvault shell
//! ```

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use taskvault::{logging, AppState, Config};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load configuration: {}. \
                 Make sure taskvault.toml exists or set TASKVAULT__SUPABASE__URL and \
                 TASKVAULT__SUPABASE__ANON_KEY environment variables.",
                e
            );
            return ExitCode::from(2);
        }
    };

    logging::init(&config.logging.level);

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match commands::run(cli.command, &state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
