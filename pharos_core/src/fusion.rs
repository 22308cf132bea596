// pharos_core/src/fusion.rs

//! Combines range frames with orientation samples into world points.
//!
//! The two sensor streams arrive asynchronously and usually at
//! different rates. The builder keeps the most recent sample of each
//! stream and emits exactly one [`FusedPoint`] per range frame, rotated
//! by whatever orientation sample is current at that moment. There is
//! no staleness bound: a stalled orientation stream keeps contributing
//! its last sample.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::decoder::RangeFrame;
use crate::error::FusionError;
use crate::quat;
use crate::types::{SensorOffset, Timestamp};

/// One orientation reading as delivered by the sensor.
///
/// The quaternion is (w, x, y, z) and is not necessarily unit norm;
/// normalization happens at fusion time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub quat: Quaternion<f64>,
    pub timestamp: Timestamp,
}

impl OrientationSample {
    pub fn new(w: f64, x: f64, y: f64, z: f64, timestamp: Timestamp) -> Self {
        Self {
            quat: Quaternion::new(w, x, y, z),
            timestamp,
        }
    }
}

/// A single fused measurement. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedPoint {
    /// Timestamp of the range frame that triggered the fusion.
    pub timestamp: Timestamp,
    /// Measured distance in meters.
    pub distance_m: f64,
    /// World-frame position of the measured point, offset applied.
    pub position: Vector3<f64>,
    /// The normalized orientation the rotation used.
    pub orientation: UnitQuaternion<f64>,
}

/// Fuses the latest samples of both streams, one point per range frame.
#[derive(Debug, Clone)]
pub struct PointBuilder {
    offset: SensorOffset,
    latest_orientation: Option<OrientationSample>,
    latest_range: Option<RangeFrame>,
}

impl PointBuilder {
    /// `offset` is the body-frame position of the rangefinder emitter
    /// relative to the orientation sensor's origin, added after
    /// rotation.
    pub fn new(offset: SensorOffset) -> Self {
        Self {
            offset,
            latest_orientation: None,
            latest_range: None,
        }
    }

    /// Replaces the cached orientation sample.
    pub fn update_orientation(&mut self, sample: OrientationSample) {
        self.latest_orientation = Some(sample);
    }

    pub fn latest_orientation(&self) -> Option<&OrientationSample> {
        self.latest_orientation.as_ref()
    }

    pub fn latest_range(&self) -> Option<&RangeFrame> {
        self.latest_range.as_ref()
    }

    /// Accepts a new range frame and attempts a fusion event.
    ///
    /// Returns `Ok(None)` while no orientation sample has ever arrived;
    /// that is the normal warm-up condition, not an error. Returns
    /// [`FusionError::DegenerateQuaternion`] when the cached orientation
    /// cannot be normalized; the event is skipped and prior state kept.
    pub fn push_range(&mut self, frame: RangeFrame) -> Result<Option<FusedPoint>, FusionError> {
        self.latest_range = Some(frame);

        let Some(sample) = self.latest_orientation else {
            return Ok(None);
        };
        let orientation = quat::normalize(&sample.quat)?;

        let distance_m = frame.distance_m();
        // The rangefinder measures along its local +Z axis.
        let local = Vector3::new(0.0, 0.0, distance_m);
        let position = quat::rotate_vector(&orientation, &local) + self.offset;

        Ok(Some(FusedPoint {
            timestamp: frame.timestamp,
            distance_m,
            position,
            orientation,
        }))
    }
}
