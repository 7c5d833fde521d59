//! Shared pieces of the orientation filters.
//!
//! Quaternions are `[w, x, y, z]` and rotate body-frame vectors into the
//! earth frame. Both filter families integrate `q̇ = ½·q⊗[0, ω]` and
//! re-normalize after every step.

use crate::error::{EstimationError, Result};
use crate::types::{ImuSample, OrientationState, Quat, Vec3};

/// Common interface of the gradient-descent and explicit-complementary filters.
pub trait OrientationFilter {
    /// Current orientation estimate
    fn orientation(&self) -> Quat;

    /// Seed the estimate (normalized; a zero quaternion is rejected)
    fn set_orientation(&mut self, q: Quat) -> Result<()>;

    /// Apply one sample; the magnetometer, when present and non-zero,
    /// selects the MARG correction
    fn update(&mut self, sample: &ImuSample) -> Result<Quat>;

    /// Back to identity with all accumulated state cleared
    fn reset(&mut self);

    /// Serializable snapshot of the filter state
    fn get_state(&self) -> OrientationState;
}

pub fn identity() -> Quat {
    Quat::new(1.0, 0.0, 0.0, 0.0)
}

/// Normalize or reject a zero quaternion
pub fn normalized(q: Quat) -> Result<Quat> {
    let norm = q.norm();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return Err(EstimationError::InvalidParameter(format!(
            "quaternion must have non-zero finite norm, got {norm}"
        )));
    }
    Ok(q / norm)
}

/// Hamilton product a⊗b
pub fn quat_multiply(a: &Quat, b: &Quat) -> Quat {
    Quat::new(
        a[0] * b[0] - a[1] * b[1] - a[2] * b[2] - a[3] * b[3],
        a[0] * b[1] + a[1] * b[0] + a[2] * b[3] - a[3] * b[2],
        a[0] * b[2] - a[1] * b[3] + a[2] * b[0] + a[3] * b[1],
        a[0] * b[3] + a[1] * b[2] - a[2] * b[1] + a[3] * b[0],
    )
}

pub fn quat_conjugate(q: &Quat) -> Quat {
    Quat::new(q[0], -q[1], -q[2], -q[3])
}

/// Rate of change of q for body angular rate ω: `½·q⊗[0, ω]`
pub fn quat_derivative(q: &Quat, gyro: &Vec3) -> Quat {
    0.5 * quat_multiply(q, &Quat::new(0.0, gyro.x, gyro.y, gyro.z))
}

/// Rotate a body-frame vector into the earth frame: `q⊗[0, v]⊗q*`
pub fn rotate_to_earth(q: &Quat, v: &Vec3) -> Vec3 {
    let p = quat_multiply(&quat_multiply(q, &Quat::new(0.0, v.x, v.y, v.z)), &quat_conjugate(q));
    Vec3::new(p[1], p[2], p[3])
}

/// Earth-frame field reference with the inclination kept and the east
/// component folded into north: `[√(hx²+hy²), 0, hz]`
pub fn earth_field_reference(q: &Quat, mag: &Vec3) -> (f64, f64) {
    let h = rotate_to_earth(q, mag);
    (h.x.hypot(h.y), h.z)
}

/// Euler step `q + q̇/f` followed by re-normalization.
///
/// Integration that collapses the quaternion to zero keeps the prior value.
pub fn integrate(q: &Quat, q_dot: &Quat, sample_frequency: f64) -> Quat {
    let next = q + q_dot / sample_frequency;
    let norm = next.norm();
    if norm.is_finite() && norm > f64::EPSILON {
        next / norm
    } else {
        log::trace!("integration degenerated (norm {norm}), keeping previous orientation");
        *q
    }
}

/// Unit vector or `None` for zero/non-finite input
pub fn unit_or_none(v: &Vec3) -> Option<Vec3> {
    let norm = v.norm();
    if norm.is_finite() && norm > 0.0 {
        Some(v / norm)
    } else {
        None
    }
}

pub(crate) fn quat_tuple(q: &Quat) -> (f64, f64, f64, f64) {
    (q[0], q[1], q[2], q[3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn yaw(angle: f64) -> Quat {
        Quat::new((angle / 2.0).cos(), 0.0, 0.0, (angle / 2.0).sin())
    }

    #[test]
    fn test_identity_product() {
        let q = normalized(Quat::new(0.3, -0.2, 0.9, 0.1)).unwrap();
        assert_relative_eq!(quat_multiply(&identity(), &q), q, epsilon = 1e-15);
        assert_relative_eq!(quat_multiply(&q, &quat_conjugate(&q)), identity(), epsilon = 1e-15);
    }

    #[test]
    fn test_rotate_x_by_yaw_90() {
        let v = rotate_to_earth(&yaw(FRAC_PI_2), &Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_constant_rate() {
        // 100 steps of 1 rad/s at 100 Hz -> ~1 rad yaw
        let gyro = Vec3::new(0.0, 0.0, 1.0);
        let mut q = identity();
        for _ in 0..100 {
            q = integrate(&q, &quat_derivative(&q, &gyro), 100.0);
        }
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(2.0 * q[3].atan2(q[0]), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_field_reference_drops_east() {
        let (bx, bz) = earth_field_reference(&identity(), &Vec3::new(0.3, 0.4, -0.5));
        assert_relative_eq!(bx, 0.5, epsilon = 1e-12);
        assert_relative_eq!(bz, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_rejects_zero() {
        assert!(normalized(Quat::zeros()).is_err());
        assert_relative_eq!(normalized(Quat::new(2.0, 0.0, 0.0, 0.0)).unwrap(), identity());
    }

    #[test]
    fn test_unit_or_none() {
        assert!(unit_or_none(&Vec3::zeros()).is_none());
        assert!(unit_or_none(&Vec3::new(f64::NAN, 0.0, 1.0)).is_none());
        assert_relative_eq!(unit_or_none(&Vec3::new(0.0, 0.0, 9.81)).unwrap(), Vec3::z());
    }
}
