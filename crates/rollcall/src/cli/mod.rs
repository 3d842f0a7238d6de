//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary and the
//! line-oriented wizard driver it runs in a terminal.

mod commands;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, CropCommand, DraftCommand, EditCommand, ImportCommand, JoinCommand, ListCommand,
    LoginCommand,
};
pub use runner::{RunOutcome, TerminalRunner};

/// rollcall - Alumni directory onboarding
///
/// Join the directory or edit your profile through a step-by-step wizard,
/// crop a profile picture, and browse the member listing.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Act as this signed-in identity (overrides `auth.owner`)
    #[arg(long, global = true, value_name = "ID")]
    pub owner: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join the directory
    Join(JoinCommand),

    /// Edit your directory profile
    Edit(EditCommand),

    /// Crop an image into a square profile picture
    Crop(CropCommand),

    /// List directory members
    List(ListCommand),

    /// Inspect or clear the resumable wizard draft
    #[command(subcommand)]
    Draft(DraftCommand),

    /// Import members from a roster spreadsheet
    Import(ImportCommand),

    /// Request an email login link
    Login(LoginCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
