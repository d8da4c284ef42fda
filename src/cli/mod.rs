//! CLI entry point for devauth.

pub mod auth;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Device authorization CLI
#[derive(Parser, Debug)]
#[command(name = "devauth", version, about = "Sign in this device from another device")]
pub struct Cli {
    /// Config file (defaults to ~/.devauth/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Session the command applies to
    #[arg(long, global = true, default_value = "default")]
    pub session: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a device flow and wait for it to finish
    Login,
    /// Show whether the session is signed in
    Status,
    /// Sign the session out
    Logout,
}
