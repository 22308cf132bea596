// pharos_core/src/types.rs

use nalgebra::Vector3;

// --- Core Type Aliases ---

/// Unix time in seconds, as reported by the capture layer.
///
/// The core never reads a clock; every sample carries the timestamp the
/// caller observed when the sample arrived.
pub type Timestamp = f64;

/// Body-frame position of the rangefinder emitter relative to the
/// orientation sensor's origin, in meters. Constant for a session.
pub type SensorOffset = Vector3<f64>;
