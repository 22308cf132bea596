// pharos_core/src/quat.rs

//! Quaternion math used by the fusion pipeline.
//!
//! All rotations in this crate are (w, x, y, z) Hamilton quaternions.
//! Sensor hardware reports quaternions that are close to, but not
//! exactly, unit norm, so every consumer goes through [`normalize`]
//! before rotating anything. A zero (or numerically zero) quaternion
//! carries no orientation information and is rejected rather than
//! silently producing garbage.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::QuatError;

/// Norms at or below this are treated as zero.
pub const NORM_EPSILON: f64 = 1e-12;

/// Quaternion conjugate. For a unit quaternion this is the inverse
/// rotation.
pub fn conjugate(q: &Quaternion<f64>) -> Quaternion<f64> {
    q.conjugate()
}

/// Hamilton product `a ⊗ b`. Non-commutative; the ordering is the
/// composition "apply `b`, then `a`".
pub fn multiply(a: &Quaternion<f64>, b: &Quaternion<f64>) -> Quaternion<f64> {
    a * b
}

/// Normalizes `q` to unit length.
///
/// Returns [`QuatError::Degenerate`] when the norm is within
/// [`NORM_EPSILON`] of zero.
pub fn normalize(q: &Quaternion<f64>) -> Result<UnitQuaternion<f64>, QuatError> {
    let norm = q.norm();
    if norm <= NORM_EPSILON {
        return Err(QuatError::Degenerate { norm });
    }
    Ok(UnitQuaternion::from_quaternion(*q))
}

/// Rotates `v` by the unit quaternion `q` via the sandwich product
/// `q ⊗ (0, v) ⊗ q*`.
///
/// Taking [`UnitQuaternion`] makes the normalization requirement a
/// compile-time fact; callers holding a raw sensor quaternion go
/// through [`normalize`] first.
pub fn rotate_vector(q: &UnitQuaternion<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let pure = Quaternion::new(0.0, v.x, v.y, v.z);
    let rotated = multiply(&multiply(q.quaternion(), &pure), &conjugate(q.quaternion()));
    rotated.imag()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn unit(q: Quaternion<f64>) -> UnitQuaternion<f64> {
        normalize(&q).unwrap()
    }

    #[test]
    fn identity_rotation_is_noop() {
        let q = unit(Quaternion::new(1.0, 0.0, 0.0, 0.0));
        let v = Vector3::new(1.0, -2.0, 3.0);
        assert_relative_eq!(rotate_vector(&q, &v), v, epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_about_z_rotates_x_to_y() {
        let q = unit(Quaternion::new(FRAC_PI_4.cos(), 0.0, 0.0, FRAC_PI_4.sin()));
        let v = rotate_vector(&q, &Vector3::x());
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_about_x_rotates_z_to_minus_y() {
        let q = unit(Quaternion::new(FRAC_PI_4.cos(), FRAC_PI_4.sin(), 0.0, 0.0));
        let v = rotate_vector(&q, &Vector3::z());
        assert_relative_eq!(v, -Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn rotation_composes_through_multiply() {
        let q1 = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let q2 = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.37);
        let composed = unit(multiply(q1.quaternion(), q2.quaternion()));

        let v = Vector3::new(0.3, -1.1, 2.4);
        let direct = rotate_vector(&composed, &v);
        let stepwise = rotate_vector(&q1, &rotate_vector(&q2, &v));
        assert_relative_eq!(direct, stepwise, epsilon = 1e-9);
    }

    #[test]
    fn hamilton_product_is_order_sensitive() {
        let a = Quaternion::new(FRAC_PI_4.cos(), FRAC_PI_4.sin(), 0.0, 0.0);
        let b = Quaternion::new(FRAC_PI_4.cos(), 0.0, FRAC_PI_4.sin(), 0.0);
        let ab = multiply(&a, &b);
        let ba = multiply(&b, &a);
        assert!((ab.coords - ba.coords).norm() > 1e-3);
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = unit(Quaternion::new(0.4, 0.3, -0.2, 0.85));
        let back = unit(conjugate(q.quaternion()));
        let v = Vector3::new(5.0, 0.5, -0.25);
        assert_relative_eq!(rotate_vector(&back, &rotate_vector(&q, &v)), v, epsilon = 1e-12);
    }

    #[test]
    fn normalize_scales_to_unit_length() {
        let q = normalize(&Quaternion::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn normalize_rejects_zero_quaternion() {
        let err = normalize(&Quaternion::new(0.0, 0.0, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, QuatError::Degenerate { norm: 0.0 });
    }

    #[test]
    fn normalize_rejects_subepsilon_norm() {
        let tiny = Quaternion::new(1e-13, 0.0, 0.0, 0.0);
        assert!(normalize(&tiny).is_err());
    }
}
