//! Cold-start attitude from a single accelerometer (and magnetometer) reading.
//!
//! Roll and pitch come from the gravity direction. Yaw is zero unless a
//! magnetometer reading is given, in which case the field is levelled with
//! the roll/pitch estimate and yaw is the angle that brings its horizontal
//! component onto the x axis.

use super::rotation::{euler_to_quaternion, euler_to_rotation};
use crate::error::{EstimationError, Result};
use crate::types::{Quat, Vec3};

/// Initial (roll, pitch, yaw) in degrees
pub fn accel_mag_to_euler(accel: &Vec3, mag: Option<&Vec3>) -> Result<(f64, f64, f64)> {
    let norm = accel.norm();
    if !norm.is_finite() || norm <= 0.0 {
        return Err(EstimationError::DegenerateMeasurement("accelerometer"));
    }
    let a = accel / norm;

    let roll = a.y.atan2(a.z);
    let pitch = (-a.x).atan2(a.y.hypot(a.z));

    let yaw = match mag.filter(|m| m.iter().all(|v| v.is_finite()) && m.norm() > 0.0) {
        Some(m) => {
            // Level the field: Ry(pitch)·Rx(roll)·m
            let levelled = euler_to_rotation(roll.to_degrees(), pitch.to_degrees(), 0.0) * m;
            (-levelled.y).atan2(levelled.x)
        }
        None => 0.0,
    };

    Ok((roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()))
}

/// Initial orientation quaternion `[w, x, y, z]`
pub fn accel_mag_to_quaternion(accel: &Vec3, mag: Option<&Vec3>) -> Result<Quat> {
    let (roll, pitch, yaw) = accel_mag_to_euler(accel, mag)?;
    Ok(euler_to_quaternion(roll, pitch, yaw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::rotation::{chordal_distance, quaternion_to_rotation};
    use approx::assert_relative_eq;

    #[test]
    fn test_level_device() {
        let q = accel_mag_to_quaternion(&Vec3::new(0.0, 0.0, 9.81), None).unwrap();
        assert_relative_eq!(q, Quat::new(1.0, 0.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_recovers_roll_and_pitch() {
        let truth = euler_to_rotation(20.0, -30.0, 0.0);
        // Accelerometer reads the up direction in the body frame
        let accel = truth.transpose() * Vec3::z() * 9.81;
        let (roll, pitch, yaw) = accel_mag_to_euler(&accel, None).unwrap();
        assert_relative_eq!(roll, 20.0, epsilon = 1e-9);
        assert_relative_eq!(pitch, -30.0, epsilon = 1e-9);
        assert_eq!(yaw, 0.0);
    }

    #[test]
    fn test_recovers_full_attitude_with_magnetometer() {
        let truth = euler_to_rotation(15.0, 25.0, 50.0);
        let earth_field = Vec3::new(0.4, 0.0, -0.9);
        let accel = truth.transpose() * Vec3::z();
        let mag = truth.transpose() * earth_field;

        let q = accel_mag_to_quaternion(&accel, Some(&mag)).unwrap();
        assert!(chordal_distance(&quaternion_to_rotation(&q), &truth) < 1e-9);
    }

    #[test]
    fn test_zero_magnetometer_means_zero_yaw() {
        let (_, _, yaw) = accel_mag_to_euler(&Vec3::new(0.1, 0.0, 1.0), Some(&Vec3::zeros())).unwrap();
        assert_eq!(yaw, 0.0);
    }

    #[test]
    fn test_zero_accelerometer_is_degenerate() {
        let err = accel_mag_to_quaternion(&Vec3::zeros(), None).unwrap_err();
        assert_eq!(err, EstimationError::DegenerateMeasurement("accelerometer"));
    }
}
