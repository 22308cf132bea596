// pharos_core/src/records.rs

//! Wire record types shared with the existing downstream consumers.
//!
//! Everything here is newline-delimited JSON on disk or over UDP, and
//! the field names are load-bearing: renaming one breaks the viewers
//! and analysis scripts that already read these files.

use serde::{Deserialize, Serialize};

use crate::align::{Alignment, AnchorObservation};
use crate::decoder::RangeFrame;
use crate::fusion::FusedPoint;
use crate::types::Timestamp;

/// One fused measurement, as appended to the capture output file and
/// forwarded over UDP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedPointRecord {
    /// Monotonic record number within a capture session, starting at 1.
    pub seq: u64,
    /// Unix seconds.
    pub t: f64,
    pub dist_cm: u16,
    pub dist_m: f64,
    pub strength: u16,
    pub temp_c: f32,
    pub qw: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    /// World-frame position, meters.
    pub pos_m: [f64; 3],
}

impl FusedPointRecord {
    pub fn new(seq: u64, frame: &RangeFrame, point: &FusedPoint) -> Self {
        let q = point.orientation.quaternion();
        Self {
            seq,
            t: point.timestamp,
            dist_cm: frame.distance_cm,
            dist_m: point.distance_m,
            strength: frame.strength,
            temp_c: frame.temperature_c,
            qw: q.w,
            qx: q.i,
            qy: q.j,
            qz: q.k,
            pos_m: [point.position.x, point.position.y, point.position.z],
        }
    }
}

/// One marker sighting inside an observation record.
///
/// Records written without camera calibration carry pixel corners
/// instead of a translation vector; those have no `tvec` and are
/// skipped when building anchor observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvec: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rvec: Option<[f64; 3]>,
}

/// One line of the anchor observation stream: all markers detected in
/// a single camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub markers: Vec<MarkerRecord>,
}

impl ObservationRecord {
    /// The anchor observations this record contributes, one per marker
    /// with a translation vector.
    pub fn observations(&self) -> impl Iterator<Item = AnchorObservation> + '_ {
        self.markers.iter().filter_map(|marker| {
            marker.tvec.map(|tvec| AnchorObservation {
                id: marker.id,
                position: tvec.into(),
                timestamp: self.timestamp,
            })
        })
    }
}

/// The alignment result record printed by the align tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    #[serde(rename = "R")]
    pub rotation: [[f64; 3]; 3],
    pub t: [f64; 3],
    pub ids: Vec<u32>,
    pub mean_residual_m: f64,
    pub max_residual_m: f64,
}

impl From<&Alignment> for AlignmentRecord {
    fn from(alignment: &Alignment) -> Self {
        let m = alignment.transform.rotation.matrix();
        let t = alignment.transform.translation;
        Self {
            rotation: [
                [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
            ],
            t: [t.x, t.y, t.z],
            ids: alignment.ids.clone(),
            mean_residual_m: alignment.mean_residual_m,
            max_residual_m: alignment.max_residual_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{align, KnownAnchors, ObservationLog};
    use nalgebra::{UnitQuaternion, Vector3};
    use serde_json::json;

    #[test]
    fn fused_point_record_field_names_are_stable() {
        let frame = RangeFrame {
            distance_cm: 200,
            strength: 1234,
            temperature_c: 21.5,
            timestamp: 1700000000.25,
        };
        let point = FusedPoint {
            timestamp: frame.timestamp,
            distance_m: 2.0,
            position: Vector3::new(0.0, 0.0, 2.0),
            orientation: UnitQuaternion::identity(),
        };
        let record = FusedPointRecord::new(1, &frame, &point);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "seq": 1,
                "t": 1700000000.25,
                "dist_cm": 200,
                "dist_m": 2.0,
                "strength": 1234,
                "temp_c": 21.5,
                "qw": 1.0,
                "qx": 0.0,
                "qy": 0.0,
                "qz": 0.0,
                "pos_m": [0.0, 0.0, 2.0],
            })
        );
    }

    #[test]
    fn observation_record_parses_detector_output() {
        let line = r#"{"timestamp": 1000.5, "markers": [{"id": 3, "tvec": [0.1, 0.2, 1.5], "rvec": [0.0, 0.0, 0.0]}, {"id": 4, "corners": [[10.0, 20.0]]}]}"#;
        let record: ObservationRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.markers.len(), 2);

        // Only the marker with a tvec becomes an observation.
        let observations: Vec<_> = record.observations().collect();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].id, 3);
        assert_eq!(observations[0].position, Vector3::new(0.1, 0.2, 1.5));
        assert_eq!(observations[0].timestamp, 1000.5);
    }

    #[test]
    fn empty_marker_list_is_a_valid_record() {
        let record: ObservationRecord = serde_json::from_str(r#"{"timestamp": 5.0}"#).unwrap();
        assert!(record.markers.is_empty());
    }

    #[test]
    fn alignment_record_uses_capital_r() {
        let mut log = ObservationLog::new();
        let mut known = KnownAnchors::new();
        for (i, p) in [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]
        .iter()
        .enumerate()
        {
            log.record(AnchorObservation {
                id: i as u32,
                position: *p,
                timestamp: 0.0,
            });
            known.insert(i as u32, [p.x, p.y, p.z]);
        }
        let alignment = align(&log, &known).unwrap();
        let record = AlignmentRecord::from(&alignment);

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("R").is_some());
        assert!(value.get("t").is_some());
        assert_eq!(value["ids"], json!([0, 1, 2, 3]));
    }

    #[test]
    fn known_anchor_file_round_trips() {
        let raw = r#"{"1": [0.0, 0.0, 0.0], "7": [2.5, -1.0, 0.3]}"#;
        let known: KnownAnchors = serde_json::from_str(raw).unwrap();
        assert_eq!(known.len(), 2);
        assert_eq!(known.get(7), Some(Vector3::new(2.5, -1.0, 0.3)));
        assert_eq!(known.get(2), None);
    }
}
