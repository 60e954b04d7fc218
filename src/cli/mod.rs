//! CLI Module
//!
//! Command-line interface for offline equalization and curve inspection.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parametric equalizer: offline render, response curves and presets
#[derive(Parser, Debug)]
#[command(name = "eq-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Equalize a WAV file and write 16-bit PCM output
    #[command(name = "render")]
    Render {
        /// Input audio file
        input: PathBuf,

        /// Band collection (JSON array); defaults to the flat preset
        #[arg(short, long)]
        bands: Option<PathBuf>,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the composite response of a band collection
    #[command(name = "response")]
    Response {
        /// Band collection (JSON array); defaults to the flat preset
        #[arg(short, long)]
        bands: Option<PathBuf>,

        /// Number of log-spaced frequencies
        #[arg(short, long, default_value_t = 31)]
        points: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the default band layout as JSON
    #[command(name = "preset")]
    Preset {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
