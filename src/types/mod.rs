pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One synchronized inertial sample.
///
/// `gyro` is in rad/s. `accel` and `mag` may use any consistent unit since
/// only their direction is used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuSample {
    pub gyro: Vec3,
    pub accel: Vec3,
    pub mag: Option<Vec3>,
}

impl ImuSample {
    /// Inertial-only sample (no magnetometer)
    pub fn imu(gyro: Vec3, accel: Vec3) -> Self {
        Self {
            gyro,
            accel,
            mag: None,
        }
    }

    /// Inertial + magnetic sample
    pub fn marg(gyro: Vec3, accel: Vec3, mag: Vec3) -> Self {
        Self {
            gyro,
            accel,
            mag: Some(mag),
        }
    }

    /// Magnetometer reading if present and usable
    pub fn usable_mag(&self) -> Option<Vec3> {
        self.mag.filter(|m| m.norm_squared() > 0.0)
    }
}

/// Serializable orientation snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrientationState {
    /// Quaternion (w, x, y, z)
    pub quaternion: (f64, f64, f64, f64),

    /// Integral feedback accumulator (explicit-complementary filter only)
    pub integral_error: Option<(f64, f64, f64)>,

    /// Number of update steps applied
    pub updates: u64,
}

/// Serializable Kalman snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KalmanSnapshot {
    pub state: Vec<f64>,
    pub covariance_trace: f64,
}
