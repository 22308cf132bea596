// pharos_capture/src/alignment.rs

//! The `align` command: load recorded anchor observations and the
//! known-anchor table, solve for the camera-to-world transform, and
//! emit the alignment record.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use pharos_core::align::{align, KnownAnchors, ObservationLog};
use pharos_core::records::{AlignmentRecord, ObservationRecord};

use crate::error::CaptureError;

/// Reads anchor observations from one NDJSON reader into the log.
///
/// Malformed lines are logged and skipped; a detector crash mid-write
/// must not invalidate a whole session of observations.
pub fn load_observations<R: BufRead>(
    reader: R,
    log: &mut ObservationLog,
) -> Result<usize, CaptureError> {
    let mut loaded = 0;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<ObservationRecord>(trimmed) {
            Ok(record) => {
                for obs in record.observations() {
                    log.record(obs);
                    loaded += 1;
                }
            }
            Err(err) => warn!(%err, "skipping malformed observation line"),
        }
    }
    Ok(loaded)
}

/// Loads the known-anchor JSON file (id to [x, y, z] world meters).
pub fn load_known_anchors(path: &Path) -> Result<KnownAnchors, CaptureError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Runs the full align command against observation files on disk.
pub fn run_align(
    observation_paths: &[PathBuf],
    known_path: &Path,
    out: Option<&Path>,
) -> Result<AlignmentRecord, CaptureError> {
    let mut log = ObservationLog::new();
    for path in observation_paths {
        let file = File::open(path)?;
        let loaded = load_observations(BufReader::new(file), &mut log)?;
        if loaded == 0 {
            return Err(CaptureError::EmptyObservations { path: path.clone() });
        }
        info!(path = %path.display(), loaded, "loaded observations");
    }

    let known = load_known_anchors(known_path)?;

    // Anchors with no known world position are excluded, not an error;
    // say so, since a typo in the known file is the usual cause.
    let unmatched: Vec<u32> = log.ids().filter(|&id| known.get(id).is_none()).collect();
    if !unmatched.is_empty() {
        info!(?unmatched, "observed anchor ids without known world positions");
    }

    let alignment = align(&log, &known)?;
    info!(
        ids = ?alignment.ids,
        mean_residual_m = alignment.mean_residual_m,
        max_residual_m = alignment.max_residual_m,
        "alignment solved"
    );

    let record = AlignmentRecord::from(&alignment);
    if let Some(path) = out {
        let mut file = File::create(path)?;
        serde_json::to_writer_pretty(&mut file, &record)?;
        file.write_all(b"\n")?;
    }
    Ok(record)
}
