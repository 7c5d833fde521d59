//! Rotation matrices, quaternion conversions and the chordal distance.
//!
//! Rotations follow the xyz sequence `R = Rz(yaw)·Ry(pitch)·Rx(roll)` with
//! angles in degrees; quaternions are `[w, x, y, z]`.

use nalgebra::Matrix3;

use crate::types::{Quat, Rot3};

/// Largest chordal distance between two rotations: √12
pub const MAX_CHORDAL_DISTANCE: f64 = 3.464_101_615_137_754_5;

/// `R = Rz·Ry·Rx` from roll, pitch and yaw given in degrees.
pub fn euler_to_rotation(roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Rot3 {
    let (sx, cx) = roll_deg.to_radians().sin_cos();
    let (sy, cy) = pitch_deg.to_radians().sin_cos();
    let (sz, cz) = yaw_deg.to_radians().sin_cos();

    #[rustfmt::skip]
    let rx = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0,  cx, -sx,
        0.0,  sx,  cx,
    );
    #[rustfmt::skip]
    let ry = Matrix3::new(
         cy, 0.0,  sy,
        0.0, 1.0, 0.0,
        -sy, 0.0,  cy,
    );
    #[rustfmt::skip]
    let rz = Matrix3::new(
         cz, -sz, 0.0,
         sz,  cz, 0.0,
        0.0, 0.0, 1.0,
    );
    rz * ry * rx
}

/// Quaternion for the same `Rz·Ry·Rx` sequence (degrees)
pub fn euler_to_quaternion(roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Quat {
    let (sr, cr) = (roll_deg.to_radians() * 0.5).sin_cos();
    let (sp, cp) = (pitch_deg.to_radians() * 0.5).sin_cos();
    let (sy, cy) = (yaw_deg.to_radians() * 0.5).sin_cos();

    Quat::new(
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    )
}

/// Rotation matrix of a quaternion `[w, x, y, z]`; in SO(3) when |q| = 1
pub fn quaternion_to_rotation(q: &Quat) -> Rot3 {
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);

    #[rustfmt::skip]
    let r = Matrix3::new(
        1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - w * z),       2.0 * (x * z + w * y),
        2.0 * (x * y + w * z),       1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - w * x),
        2.0 * (x * z - w * y),       2.0 * (w * x + y * z),       1.0 - 2.0 * (x * x + y * y),
    );
    r
}

/// Unit quaternion of a rotation matrix (Shepperd's method), with `w >= 0`
pub fn rotation_to_quaternion(r: &Rot3) -> Quat {
    let trace = r.trace();

    let q = if trace > 0.0 {
        let s = 2.0 * (trace + 1.0).sqrt();
        Quat::new(
            0.25 * s,
            (r[(2, 1)] - r[(1, 2)]) / s,
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(1, 0)] - r[(0, 1)]) / s,
        )
    } else if r[(0, 0)] > r[(1, 1)] && r[(0, 0)] > r[(2, 2)] {
        let s = 2.0 * (1.0 + r[(0, 0)] - r[(1, 1)] - r[(2, 2)]).sqrt();
        Quat::new(
            (r[(2, 1)] - r[(1, 2)]) / s,
            0.25 * s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
        )
    } else if r[(1, 1)] > r[(2, 2)] {
        let s = 2.0 * (1.0 + r[(1, 1)] - r[(0, 0)] - r[(2, 2)]).sqrt();
        Quat::new(
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            0.25 * s,
            (r[(1, 2)] + r[(2, 1)]) / s,
        )
    } else {
        let s = 2.0 * (1.0 + r[(2, 2)] - r[(0, 0)] - r[(1, 1)]).sqrt();
        Quat::new(
            (r[(1, 0)] - r[(0, 1)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
            (r[(1, 2)] + r[(2, 1)]) / s,
            0.25 * s,
        )
    };

    let q = if q[0] < 0.0 { -q } else { q };
    q / q.norm()
}

/// `sqrt(trace((R1 - R2)ᵀ(R1 - R2)))`, in `[0, √12]` for valid rotations
pub fn chordal_distance(r1: &Rot3, r2: &Rot3) -> f64 {
    let a = r1 - r2;
    (a.transpose() * a).trace().max(0.0).sqrt()
}

/// `|det R - 1| <= tol` and `‖RᵀR - I‖ <= tol`
pub fn is_rotation(r: &Rot3, tol: f64) -> bool {
    (r.determinant() - 1.0).abs() <= tol && (r.transpose() * r - Rot3::identity()).norm() <= tol
}
