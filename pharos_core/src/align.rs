// pharos_core/src/align.rs

//! Rigid alignment between the camera frame and the world frame.
//!
//! Physical reference markers ("anchors") have known world positions.
//! The camera stack observes a sparse subset of them in its own frame.
//! Matching the latest observation of each anchor against the known
//! table and solving Procrustes/Umeyama yields the rotation and
//! translation that map camera-frame points into world coordinates.
//!
//! The solve is a pure function of its inputs and is recomputed from
//! scratch on every call; nothing here holds state across runs.

use std::collections::HashMap;

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::AlignError;
use crate::types::Timestamp;

/// Minimum matched anchors for a well-posed rotation + translation
/// solve (three non-collinear points).
pub const MIN_ANCHORS: usize = 3;

/// One sighting of an anchor marker in the camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorObservation {
    pub id: u32,
    /// Marker position in the camera frame, meters.
    pub position: Vector3<f64>,
    pub timestamp: Timestamp,
}

/// Accumulated observation history, one list per anchor id.
#[derive(Debug, Clone, Default)]
pub struct ObservationLog {
    samples: HashMap<u32, Vec<AnchorObservation>>,
}

impl ObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, obs: AnchorObservation) {
        self.samples.entry(obs.id).or_default().push(obs);
    }

    pub fn len(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Ids with at least one observation.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.samples.keys().copied()
    }

    /// The most recent observation of each anchor, by timestamp.
    /// Among equal timestamps the later-recorded observation wins.
    pub fn latest_per_id(&self) -> Vec<AnchorObservation> {
        let mut latest: Vec<AnchorObservation> = self
            .samples
            .values()
            .filter_map(|history| {
                history.iter().fold(None, |best: Option<&AnchorObservation>, obs| {
                    match best {
                        Some(b) if obs.timestamp < b.timestamp => Some(b),
                        _ => Some(obs),
                    }
                })
            })
            .copied()
            .collect();
        latest.sort_by_key(|obs| obs.id);
        latest
    }
}

/// The externally supplied anchor id to world position table.
///
/// The table is keyed by the id's decimal string form because producers
/// write the JSON file with either integer-looking or string keys, and
/// JSON object keys are strings either way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownAnchors {
    anchors: HashMap<String, [f64; 3]>,
}

impl KnownAnchors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, position: [f64; 3]) {
        self.anchors.insert(id.to_string(), position);
    }

    pub fn get(&self, id: u32) -> Option<Vector3<f64>> {
        self.anchors
            .get(&id.to_string())
            .map(|p| Vector3::new(p[0], p[1], p[2]))
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// A proper rigid transform: rotation (det +1) followed by translation.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    /// Maps a camera-frame point into the world frame.
    pub fn apply(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

/// Result of one alignment solve.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub transform: RigidTransform,
    /// Anchor ids that contributed, ascending.
    pub ids: Vec<u32>,
    /// Mean of the per-anchor residuals, meters.
    pub mean_residual_m: f64,
    /// Largest per-anchor residual, meters.
    pub max_residual_m: f64,
}

/// Matches observations against the known table and solves for the
/// camera-to-world transform.
///
/// For every anchor id present in both sets, the most recent
/// observation is used. Ids with no known-world counterpart are
/// silently excluded; fewer than [`MIN_ANCHORS`] matches is
/// [`AlignError::InsufficientAnchors`].
pub fn align(observations: &ObservationLog, known: &KnownAnchors) -> Result<Alignment, AlignError> {
    let mut ids = Vec::new();
    let mut observed = Vec::new();
    let mut world = Vec::new();

    for obs in observations.latest_per_id() {
        if let Some(position) = known.get(obs.id) {
            ids.push(obs.id);
            observed.push(obs.position);
            world.push(position);
        }
    }

    if ids.len() < MIN_ANCHORS {
        return Err(AlignError::InsufficientAnchors {
            matched: ids.len(),
            needed: MIN_ANCHORS,
        });
    }

    let transform = umeyama(&observed, &world)?;

    let mut sum = 0.0;
    let mut max = 0.0f64;
    for (obs, target) in observed.iter().zip(&world) {
        let residual = (transform.apply(obs) - target).norm();
        sum += residual;
        max = max.max(residual);
    }

    Ok(Alignment {
        transform,
        mean_residual_m: sum / ids.len() as f64,
        max_residual_m: max,
        ids,
    })
}

/// Least-squares rigid transform from `observed` onto `known`
/// (Umeyama, rotation-only form).
fn umeyama(
    observed: &[Vector3<f64>],
    known: &[Vector3<f64>],
) -> Result<RigidTransform, AlignError> {
    debug_assert_eq!(observed.len(), known.len());
    let n = observed.len() as f64;

    let mu_obs: Vector3<f64> = observed.iter().sum::<Vector3<f64>>() / n;
    let mu_known: Vector3<f64> = known.iter().sum::<Vector3<f64>>() / n;

    // Cross-covariance of the centered sets, oriented so that U * Vᵀ
    // rotates observed points onto known points.
    let mut sigma = Matrix3::zeros();
    for (obs, target) in observed.iter().zip(known) {
        sigma += (target - mu_known) * (obs - mu_obs).transpose();
    }
    sigma /= n;

    let svd = sigma.svd(true, true);
    let u = svd.u.ok_or(AlignError::SvdFailed)?;
    let mut v_t = svd.v_t.ok_or(AlignError::SvdFailed)?;

    let mut rotation = u * v_t;
    // SVD alone can return an improper orthogonal matrix (a reflection)
    // for degenerate or noisy configurations. Flip the smallest
    // singular direction to force det +1.
    if rotation.determinant() < 0.0 {
        for j in 0..3 {
            v_t[(2, j)] = -v_t[(2, j)];
        }
        rotation = u * v_t;
    }

    let rotation = Rotation3::from_matrix_unchecked(rotation);
    let translation = mu_known - rotation * mu_obs;

    Ok(RigidTransform {
        rotation,
        translation,
    })
}
