// pharos_capture/src/source.rs

//! Hardware-facing implementations of the core collaborator traits.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serialport::SerialPort;
use tracing::{debug, warn};

use pharos_core::sources::{ByteSource, OrientationSource};

use crate::error::CaptureError;

/// UART byte source for the rangefinder.
///
/// 8 data bits, no parity, one stop bit. A read timeout is reported as
/// an empty read so the capture loop can keep polling.
pub struct SerialByteSource {
    port: Box<dyn SerialPort>,
}

impl SerialByteSource {
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, CaptureError> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;
        debug!(path, baud, "opened serial port");
        Ok(Self { port })
    }
}

impl ByteSource for SerialByteSource {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// One line of an orientation feed.
#[derive(Debug, Clone, Copy, Deserialize)]
struct OrientationLine {
    #[allow(dead_code)]
    t: f64,
    qw: f64,
    qx: f64,
    qy: f64,
    qz: f64,
}

/// Orientation source backed by an NDJSON feed (a file or FIFO written
/// by the orientation reader process).
///
/// Each poll consumes every line currently available and reports the
/// last well-formed one; malformed lines are logged and skipped.
pub struct FeedOrientationSource<R> {
    reader: R,
    line: String,
}

impl FeedOrientationSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> FeedOrientationSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> OrientationSource for FeedOrientationSource<R> {
    fn latest_quaternion(&mut self) -> Option<(f64, f64, f64, f64)> {
        let mut latest = None;
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = self.line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<OrientationLine>(trimmed) {
                        Ok(sample) => latest = Some((sample.qw, sample.qx, sample.qy, sample.qz)),
                        Err(err) => warn!(%err, "skipping malformed orientation line"),
                    }
                }
                Err(err) => {
                    warn!(%err, "orientation feed read failed");
                    break;
                }
            }
        }
        latest
    }
}
