// pharos_capture/src/sink.rs

//! Record sinks for the capture loop.
//!
//! Every fused point record goes to the NDJSON output file; the config
//! can additionally forward each record over UDP to a live consumer.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::net::{ToSocketAddrs, UdpSocket};
use std::path::Path;

use tracing::info;

use pharos_core::records::FusedPointRecord;

use crate::config::ForwardConfig;
use crate::error::CaptureError;

/// A destination for fused point records.
pub trait RecordSink {
    fn write_record(&mut self, record: &FusedPointRecord) -> Result<(), CaptureError>;
}

/// Appends one JSON line per record, flushing after each so a crash
/// loses at most the record being written.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl JsonlSink<BufWriter<std::fs::File>> {
    pub fn append(path: &Path) -> Result<Self, CaptureError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "appending fused point records");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonlSink<W> {
    fn write_record(&mut self, record: &FusedPointRecord) -> Result<(), CaptureError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Sends each record as one JSON datagram.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    pub fn connect(addr: &str) -> Result<Self, CaptureError> {
        let mut resolved = addr.to_socket_addrs().map_err(|_| CaptureError::BadForwardAddr {
            addr: addr.to_string(),
        })?;
        let dest = resolved.next().ok_or_else(|| CaptureError::BadForwardAddr {
            addr: addr.to_string(),
        })?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(dest)?;
        info!(%dest, "forwarding fused point records over UDP");
        Ok(Self { socket })
    }
}

impl RecordSink for UdpSink {
    fn write_record(&mut self, record: &FusedPointRecord) -> Result<(), CaptureError> {
        let payload = serde_json::to_vec(record)?;
        self.socket.send(&payload)?;
        Ok(())
    }
}

/// Builds the configured sink set: the output file, plus any forwarder.
pub fn build_sinks(
    path: &Path,
    forward: &ForwardConfig,
) -> Result<Vec<Box<dyn RecordSink + Send>>, CaptureError> {
    let mut sinks: Vec<Box<dyn RecordSink + Send>> = vec![Box::new(JsonlSink::append(path)?)];
    match forward {
        ForwardConfig::Off => {}
        ForwardConfig::Udp { addr } => sinks.push(Box::new(UdpSink::connect(addr)?)),
    }
    Ok(sinks)
}
