//! Homogeneous transforms
//!
//! ```text
//! T = | R t |
//!     | 0 1 |
//! ```

use crate::types::{Rot3, Transform4, Vec3};

/// Compose a 4×4 homogeneous transform from rotation R and translation t
pub fn compose_transform(r: &Rot3, t: &Vec3) -> Transform4 {
    let mut m = Transform4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    m
}

/// Rotation block of a homogeneous transform
pub fn rotation_part(m: &Transform4) -> Rot3 {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Translation column of a homogeneous transform
pub fn translation_part(m: &Transform4) -> Vec3 {
    m.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Closed-form inverse `| Rᵀ  -Rᵀ·t |` over `| 0  1 |`
pub fn invert_transform(m: &Transform4) -> Transform4 {
    let r_t = rotation_part(m).transpose();
    let t = translation_part(m);
    compose_transform(&r_t, &(-(r_t * t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::rotation::euler_to_rotation;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn test_compose_layout() {
        let r = euler_to_rotation(10.0, 0.0, 45.0);
        let t = Vec3::new(1.0, -2.0, 3.0);
        let m = compose_transform(&r, &t);
        assert_eq!(rotation_part(&m), r);
        assert_eq!(translation_part(&m), t);
        assert_eq!(m.row(3).into_owned(), nalgebra::RowVector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_inverse_matches_generic_inverse() {
        let m = compose_transform(&euler_to_rotation(-30.0, 60.0, 120.0), &Vec3::new(0.5, 4.0, -7.0));
        let inv = invert_transform(&m);
        assert_relative_eq!(inv * m, Transform4::identity(), epsilon = 1e-12);
        assert_relative_eq!(inv, m.try_inverse().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_point_round_trip() {
        let m = compose_transform(&euler_to_rotation(5.0, 15.0, 25.0), &Vec3::new(1.0, 2.0, 3.0));
        let p = Vector4::new(0.3, -0.7, 2.0, 1.0);
        let moved = m * p;
        assert_relative_eq!(invert_transform(&m) * moved, p, epsilon = 1e-12);
    }
}
