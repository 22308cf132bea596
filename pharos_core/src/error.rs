// pharos_core/src/error.rs

use thiserror::Error;

/// Errors from quaternion operations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum QuatError {
    /// The quaternion's Euclidean norm is too close to zero to define a
    /// rotation.
    #[error("degenerate quaternion: norm {norm} is effectively zero")]
    Degenerate { norm: f64 },
}

/// Errors from the fusion point builder.
///
/// A failed fusion event leaves the builder's cached samples untouched;
/// the caller skips the event and continues.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FusionError {
    /// The cached orientation sample cannot be normalized.
    #[error("orientation sample unusable: {0}")]
    DegenerateQuaternion(#[from] QuatError),
}

/// Errors from the rigid alignment estimator.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AlignError {
    /// Fewer than the minimum number of anchor ids were present in both
    /// the observation set and the known-anchor table.
    #[error("insufficient anchors: {matched} matched, need at least {needed}")]
    InsufficientAnchors { matched: usize, needed: usize },

    /// The SVD of the cross-covariance matrix did not converge.
    #[error("singular value decomposition failed on the anchor covariance")]
    SvdFailed,
}
