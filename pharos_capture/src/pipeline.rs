// pharos_capture/src/pipeline.rs

//! The capture loop: serial bytes in, fused point records out.
//!
//! Two readers run independently. The orientation poller stores samples
//! into a shared slot at its own rate; the byte loop decodes range
//! frames and fuses each one with whatever orientation is current. The
//! slot is the only state shared between the threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use pharos_core::decoder::FrameDecoder;
use pharos_core::fusion::{OrientationSample, PointBuilder};
use pharos_core::records::FusedPointRecord;
use pharos_core::slot::SampleSlot;
use pharos_core::sources::{ByteSource, OrientationSource};
use pharos_core::types::SensorOffset;

use crate::error::CaptureError;
use crate::sink::RecordSink;

/// Unix time in seconds. The core is clock-free; all timestamps enter
/// the system here.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Decoder + point builder + record numbering, driven by byte chunks.
pub struct Pipeline {
    decoder: FrameDecoder,
    builder: PointBuilder,
    orientation: Arc<SampleSlot<OrientationSample>>,
    seq: u64,
    rejected_seen: u64,
}

impl Pipeline {
    pub fn new(offset: SensorOffset) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            builder: PointBuilder::new(offset),
            orientation: Arc::new(SampleSlot::new()),
            seq: 0,
            rejected_seen: 0,
        }
    }

    /// The slot the orientation poller writes into.
    pub fn orientation_slot(&self) -> Arc<SampleSlot<OrientationSample>> {
        Arc::clone(&self.orientation)
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Feeds a chunk of protocol bytes, returning one record per fused
    /// point. Checksum failures and not-ready or degenerate fusion
    /// events produce no record.
    pub fn ingest(&mut self, bytes: &[u8], timestamp: f64) -> Vec<FusedPointRecord> {
        let mut records = Vec::new();
        for frame in self.decoder.drain(bytes, timestamp) {
            if let Some(sample) = self.orientation.latest() {
                self.builder.update_orientation(sample);
            }
            match self.builder.push_range(frame) {
                Ok(Some(point)) => {
                    self.seq += 1;
                    records.push(FusedPointRecord::new(self.seq, &frame, &point));
                }
                Ok(None) => debug!("range frame before first orientation sample, skipping"),
                Err(err) => warn!(%err, "fusion event skipped"),
            }
        }

        let rejected = self.decoder.rejected_frames();
        if rejected > self.rejected_seen {
            warn!(
                total = rejected,
                "dropped {} corrupt frame(s)",
                rejected - self.rejected_seen
            );
            self.rejected_seen = rejected;
        }
        records
    }
}

/// Drives a byte source until it goes idle (replay) or forever
/// (live serial), pushing every record into the sinks.
pub fn pump<B: ByteSource>(
    source: &mut B,
    pipeline: &mut Pipeline,
    sinks: &mut [Box<dyn RecordSink + Send>],
    stop_on_idle: bool,
) -> Result<(), CaptureError> {
    let mut buf = [0u8; 256];
    loop {
        let n = source.read_bytes(&mut buf)?;
        if n == 0 {
            if stop_on_idle {
                break;
            }
            continue;
        }
        for record in pipeline.ingest(&buf[..n], unix_now()) {
            for sink in sinks.iter_mut() {
                sink.write_record(&record)?;
            }
        }
    }
    info!(
        decoded = pipeline.decoder().decoded_frames(),
        rejected = pipeline.decoder().rejected_frames(),
        emitted = pipeline.seq,
        "byte source drained"
    );
    Ok(())
}

/// Spawns the orientation poller thread.
///
/// The poller stores every new quaternion into the slot until the
/// shutdown flag is raised. Sample timestamps are stamped at poll time.
pub fn spawn_orientation_poller<O>(
    mut source: O,
    slot: Arc<SampleSlot<OrientationSample>>,
    rate_hz: f64,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()>
where
    O: OrientationSource + Send + 'static,
{
    let interval = Duration::from_secs_f64(1.0 / rate_hz.max(0.1));
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            if let Some((w, x, y, z)) = source.latest_quaternion() {
                slot.store(OrientationSample::new(w, x, y, z, unix_now()));
            }
            thread::sleep(interval);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use pharos_core::decoder::{FRAME_HEADER, FRAME_LEN};

    fn frame_bytes(distance_cm: u16) -> [u8; FRAME_LEN] {
        let d = distance_cm.to_le_bytes();
        let mut bytes = [FRAME_HEADER, FRAME_HEADER, d[0], d[1], 0x10, 0x00, 0x00, 0x08, 0];
        bytes[8] = bytes[..8].iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
        bytes
    }

    #[test]
    fn frames_before_orientation_emit_nothing() {
        let mut pipeline = Pipeline::new(Vector3::zeros());
        let records = pipeline.ingest(&frame_bytes(100), 1.0);
        assert!(records.is_empty());
    }

    #[test]
    fn fused_records_are_numbered_from_one() {
        let mut pipeline = Pipeline::new(Vector3::zeros());
        pipeline
            .orientation_slot()
            .store(OrientationSample::new(1.0, 0.0, 0.0, 0.0, 0.5));

        let mut stream = Vec::new();
        stream.extend_from_slice(&frame_bytes(100));
        stream.extend_from_slice(&frame_bytes(250));
        let records = pipeline.ingest(&stream, 1.0);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, 1);
        assert_eq!(records[1].seq, 2);
        assert_relative_eq!(records[0].dist_m, 1.0);
        assert_eq!(records[1].dist_cm, 250);
        assert_relative_eq!(records[1].pos_m[2], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn corrupt_frames_produce_no_records() {
        let mut pipeline = Pipeline::new(Vector3::zeros());
        pipeline
            .orientation_slot()
            .store(OrientationSample::new(1.0, 0.0, 0.0, 0.0, 0.5));

        let mut corrupt = frame_bytes(100);
        corrupt[2] ^= 0xFF;
        let records = pipeline.ingest(&corrupt, 1.0);
        assert!(records.is_empty());
        assert_eq!(pipeline.decoder().rejected_frames(), 1);
    }

    #[test]
    fn degenerate_orientation_skips_but_does_not_kill_the_loop() {
        let mut pipeline = Pipeline::new(Vector3::zeros());
        pipeline
            .orientation_slot()
            .store(OrientationSample::new(0.0, 0.0, 0.0, 0.0, 0.5));
        assert!(pipeline.ingest(&frame_bytes(100), 1.0).is_empty());

        pipeline
            .orientation_slot()
            .store(OrientationSample::new(1.0, 0.0, 0.0, 0.0, 0.6));
        let records = pipeline.ingest(&frame_bytes(100), 2.0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seq, 1);
    }
}
