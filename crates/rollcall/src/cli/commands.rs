//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Join command arguments.
#[derive(Debug, Args)]
pub struct JoinCommand {
    /// Discard any saved draft and start from the beginning
    #[arg(long)]
    pub fresh: bool,
}

/// Edit command arguments.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Discard any saved draft and start from the stored profile
    #[arg(long)]
    pub fresh: bool,
}

/// Crop command arguments.
#[derive(Debug, Args)]
pub struct CropCommand {
    /// Image to crop
    pub input: PathBuf,

    /// Write the JPEG here instead of printing a data URI
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Zoom factor (clamped to the configured bounds)
    #[arg(short, long, default_value = "1.0")]
    pub zoom: f32,

    /// Horizontal offset of the crop centre, in source pixels
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub offset_x: f32,

    /// Vertical offset of the crop centre, in source pixels
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub offset_y: f32,

    /// Output edge length in pixels (defaults to the configured size)
    #[arg(short, long)]
    pub size: Option<u32>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show profiles whose card text contains this
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only show profiles in this sphere (repeatable)
    #[arg(long = "sphere", value_name = "SPHERE")]
    pub spheres: Vec<String>,

    /// Only show profiles in this location (repeatable)
    #[arg(long = "location", value_name = "LOCATION")]
    pub locations: Vec<String>,

    /// Oldest cohort first
    #[arg(long)]
    pub oldest: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Draft commands.
#[derive(Debug, Subcommand)]
pub enum DraftCommand {
    /// Show the saved draft without consuming it
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete the saved draft
    Clear,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Tab-separated roster export with a header row
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Latest graduation year to import (defaults to last year)
    #[arg(long, value_name = "YEAR")]
    pub latest_year: Option<i32>,
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Address to send the login link to
    pub email: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}
