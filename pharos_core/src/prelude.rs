// pharos_core/src/prelude.rs

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::align::{
    Alignment, AnchorObservation, KnownAnchors, ObservationLog, RigidTransform,
};
pub use crate::decoder::{FrameDecoder, FrameStep, RangeFrame};
pub use crate::fusion::{FusedPoint, OrientationSample, PointBuilder};
pub use crate::slot::SampleSlot;
pub use crate::types::{SensorOffset, Timestamp};

// --- Collaborator Seams ---
pub use crate::sources::{ByteSource, OrientationSource};

// --- Wire Records ---
pub use crate::records::{AlignmentRecord, FusedPointRecord, MarkerRecord, ObservationRecord};

// --- Errors and Operations ---
pub use crate::align::{align, MIN_ANCHORS};
pub use crate::error::{AlignError, FusionError, QuatError};
