// pharos_capture/src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pharos: rangefinder + orientation capture and anchor alignment.
///
/// The `capture` command fuses the two sensor streams into world-frame
/// points; the `align` command calibrates the camera-to-world transform
/// from recorded anchor observations.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the capture loop, appending fused point records to the sink.
    Capture {
        /// Path to the capture TOML configuration file.
        #[arg(short, long, default_value = "capture.toml")]
        config: PathBuf,

        /// Replay protocol bytes from a file instead of opening the
        /// serial port. The loop stops at end of file.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Override the serial port path from the config file.
        #[arg(long)]
        port: Option<String>,

        /// Override the output NDJSON path from the config file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Compute the camera-to-world alignment from anchor observations.
    Align {
        /// Observation NDJSON files produced by the marker detector.
        #[arg(long, required = true, num_args = 1..)]
        observations: Vec<PathBuf>,

        /// JSON file mapping anchor id to [x, y, z] world meters.
        #[arg(long)]
        known: PathBuf,

        /// Also write the alignment record to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
