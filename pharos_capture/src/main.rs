// pharos_capture/src/main.rs

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nalgebra::Vector3;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pharos_capture::cli::{Cli, Command};
use pharos_capture::config::CaptureConfig;
use pharos_capture::error::CaptureError;
use pharos_capture::pipeline::{pump, spawn_orientation_poller, Pipeline};
use pharos_capture::sink::build_sinks;
use pharos_capture::alignment;
use pharos_capture::source::{FeedOrientationSource, SerialByteSource};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!(%err, "command failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CaptureError> {
    match cli.command {
        Command::Capture {
            config,
            replay,
            port,
            out,
        } => {
            let mut config = CaptureConfig::load(&config)?;
            if let Some(port) = port {
                config.serial.port = port;
            }
            if let Some(out) = out {
                config.sink.path = out;
            }
            run_capture(&config, replay.as_deref())
        }
        Command::Align {
            observations,
            known,
            out,
        } => {
            let record = alignment::run_align(&observations, &known, out.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

fn run_capture(config: &CaptureConfig, replay: Option<&Path>) -> Result<(), CaptureError> {
    let mut sinks = build_sinks(&config.sink.path, &config.sink.forward)?;
    let mut pipeline = Pipeline::new(Vector3::from(config.fusion.offset_m));

    let shutdown = Arc::new(AtomicBool::new(false));
    let poller = match &config.orientation.feed {
        Some(feed) => {
            let feed = FeedOrientationSource::open(feed)?;
            Some(spawn_orientation_poller(
                feed,
                pipeline.orientation_slot(),
                config.orientation.rate_hz,
                Arc::clone(&shutdown),
            ))
        }
        None => {
            tracing::warn!("no orientation feed configured; every range frame will be skipped");
            None
        }
    };

    let result = match replay {
        Some(path) => {
            // Any reader is a byte source; a replay is just a file.
            let mut source = std::fs::File::open(path)?;
            pump(&mut source, &mut pipeline, &mut sinks, true)
        }
        None => {
            let timeout = Duration::from_secs_f64(config.serial.timeout_s.max(0.001));
            let mut source =
                SerialByteSource::open(&config.serial.port, config.serial.baud, timeout)?;
            pump(&mut source, &mut pipeline, &mut sinks, false)
        }
    };

    shutdown.store(true, Ordering::Relaxed);
    if let Some(handle) = poller {
        let _ = handle.join();
    }
    result
}
