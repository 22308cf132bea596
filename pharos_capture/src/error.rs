// pharos_capture/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

use pharos_core::error::AlignError;

/// Errors surfaced by the capture and alignment commands.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("record encode/decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Align(#[from] AlignError),

    #[error("invalid forward address `{addr}`")]
    BadForwardAddr { addr: String },

    #[error("no observations found in {path}")]
    EmptyObservations { path: PathBuf },
}

impl From<figment::Error> for CaptureError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
