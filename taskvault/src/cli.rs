use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "taskvault")]
#[command(about = "Authenticated to-do list client")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Configuration file (defaults to ./taskvault.toml when present)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        /// Read from TASKVAULT_PASSWORD, or prompted with echo off when omitted
        #[arg(long, env = "TASKVAULT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in with an existing account
    SignIn {
        #[arg(long)]
        email: String,
        /// Read from TASKVAULT_PASSWORD, or prompted with echo off when omitted
        #[arg(long, env = "TASKVAULT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the current session
    SignOut,

    /// Show the signed-in identity
    Whoami,

    /// Show your profile, creating it on first use
    Profile,

    /// List your tasks, newest first
    List,

    /// Add a task
    Add {
        /// Task title (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Flip a task between done and not done
    Toggle { id: Uuid },

    /// Delete a task
    Rm { id: Uuid },

    /// Interactive session
    Shell,
}
