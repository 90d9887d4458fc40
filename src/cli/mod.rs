//! CLI interface for Analogue

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Polyphonic virtual-analog synthesizer
#[derive(Parser)]
#[command(name = "analogue")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play live from MIDI and the computer keyboard
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "analogue.yaml")]
        config: PathBuf,

        /// Disable the spectrum display
        #[arg(long)]
        no_viz: bool,
    },

    /// Render the configured sequence to a WAV file
    Render {
        /// Configuration file path
        #[arg(short, long, default_value = "analogue.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Seconds to keep rendering after the last note ends
        #[arg(short, long, default_value = "1.0")]
        tail: f64,
    },

    /// List audio output devices and MIDI inputs
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "analogue.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
