//! Gradient-descent orientation filter (Madgwick AHRS).
//!
//! Gyroscope integration is corrected by one normalized gradient-descent step
//! on the misalignment between the predicted and measured gravity direction,
//! plus the magnetic field direction when a usable magnetometer reading is
//! present. One gain `beta` is used for both the IMU and MARG corrections.
//!
//! Reference: Madgwick, S. O. H. (2010). "An efficient orientation filter
//! for inertial and inertial/magnetic sensor arrays."

use crate::error::{ensure_non_negative, ensure_positive, Result};
use crate::filters::ahrs::{
    earth_field_reference, identity, integrate, normalized, quat_derivative, quat_tuple,
    unit_or_none, OrientationFilter,
};
use crate::filters::check_sample;
use crate::types::{
    ImuSample, JacobianImu, JacobianMarg, ObjectiveImu, ObjectiveMarg, OrientationState, Quat,
    Vec3,
};

pub const DEFAULT_BETA: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct Madgwick {
    /// Orientation estimate (w, x, y, z)
    q: Quat,

    /// Gradient step magnitude [rad/s]
    beta: f64,

    /// Sample rate [Hz]
    sample_frequency: f64,

    updates: u64,
}

impl Madgwick {
    pub fn new(beta: f64, sample_frequency: f64) -> Result<Self> {
        ensure_non_negative("beta", beta)?;
        ensure_positive("sample_frequency", sample_frequency)?;
        log::debug!("madgwick filter created: beta={beta}, f={sample_frequency} Hz");
        Ok(Self {
            q: identity(),
            beta,
            sample_frequency,
            updates: 0,
        })
    }

    /// Start from a known orientation (e.g. `accel_mag_to_quaternion`)
    pub fn with_orientation(mut self, q: Quat) -> Result<Self> {
        self.q = normalized(q)?;
        Ok(self)
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        ensure_non_negative("beta", beta)?;
        self.beta = beta;
        Ok(())
    }

    pub fn sample_frequency(&self) -> f64 {
        self.sample_frequency
    }

    pub fn set_sample_frequency(&mut self, sample_frequency: f64) -> Result<()> {
        ensure_positive("sample_frequency", sample_frequency)?;
        self.sample_frequency = sample_frequency;
        Ok(())
    }
}

/// `Jᵀ·f` for the gravity objective with reference `[0, 0, 1]`
fn gradient_imu(q: &Quat, a: &Vec3) -> Quat {
    let (qw, qx, qy, qz) = quat_tuple(q);

    let f = ObjectiveImu::new(
        2.0 * (qx * qz - qw * qy) - a.x,
        2.0 * (qw * qx + qy * qz) - a.y,
        2.0 * (0.5 - qx * qx - qy * qy) - a.z,
    );
    #[rustfmt::skip]
    let j = JacobianImu::new(
        -2.0 * qy,  2.0 * qz, -2.0 * qw, 2.0 * qx,
         2.0 * qx,  2.0 * qw,  2.0 * qz, 2.0 * qy,
         0.0,      -4.0 * qx, -4.0 * qy, 0.0,
    );
    j.transpose() * f
}

/// `Jᵀ·f` for the stacked gravity + field objective with field reference
/// `[bx, 0, bz]`
fn gradient_marg(q: &Quat, a: &Vec3, m: &Vec3) -> Quat {
    let (qw, qx, qy, qz) = quat_tuple(q);
    let (bx, bz) = earth_field_reference(q, m);

    let f = ObjectiveMarg::new(
        2.0 * (qx * qz - qw * qy) - a.x,
        2.0 * (qw * qx + qy * qz) - a.y,
        2.0 * (0.5 - qx * qx - qy * qy) - a.z,
        2.0 * bx * (0.5 - qy * qy - qz * qz) + 2.0 * bz * (qx * qz - qw * qy) - m.x,
        2.0 * bx * (qx * qy - qw * qz) + 2.0 * bz * (qw * qx + qy * qz) - m.y,
        2.0 * bx * (qw * qy + qx * qz) + 2.0 * bz * (0.5 - qx * qx - qy * qy) - m.z,
    );
    #[rustfmt::skip]
    let j = JacobianMarg::new(
        -2.0 * qy,                    2.0 * qz,                    -2.0 * qw,                    2.0 * qx,
         2.0 * qx,                    2.0 * qw,                     2.0 * qz,                    2.0 * qy,
         0.0,                        -4.0 * qx,                    -4.0 * qy,                    0.0,
        -2.0 * bz * qy,               2.0 * bz * qz,               -4.0 * bx * qy - 2.0 * bz * qw, -4.0 * bx * qz + 2.0 * bz * qx,
        -2.0 * bx * qz + 2.0 * bz * qx, 2.0 * bx * qy + 2.0 * bz * qw, 2.0 * bx * qx + 2.0 * bz * qz, -2.0 * bx * qw + 2.0 * bz * qy,
         2.0 * bx * qy,               2.0 * bx * qz - 4.0 * bz * qx, 2.0 * bx * qw - 4.0 * bz * qy, 2.0 * bx * qx,
    );
    j.transpose() * f
}

impl OrientationFilter for Madgwick {
    fn orientation(&self) -> Quat {
        self.q
    }

    fn set_orientation(&mut self, q: Quat) -> Result<()> {
        self.q = normalized(q)?;
        Ok(())
    }

    fn update(&mut self, sample: &ImuSample) -> Result<Quat> {
        check_sample(sample)?;

        let mut q_dot = quat_derivative(&self.q, &sample.gyro);

        match unit_or_none(&sample.accel) {
            Some(a) => {
                let gradient = match sample.usable_mag().and_then(|m| unit_or_none(&m)) {
                    Some(m) => gradient_marg(&self.q, &a, &m),
                    None => gradient_imu(&self.q, &a),
                };
                // Already aligned: nothing to descend
                let norm = gradient.norm();
                if norm > f64::EPSILON {
                    q_dot -= self.beta * gradient / norm;
                }
            }
            None => log::trace!("zero accelerometer, gyroscope-only integration"),
        }

        self.q = integrate(&self.q, &q_dot, self.sample_frequency);
        self.updates += 1;
        Ok(self.q)
    }

    fn reset(&mut self) {
        self.q = identity();
        self.updates = 0;
    }

    fn get_state(&self) -> OrientationState {
        OrientationState {
            quaternion: quat_tuple(&self.q),
            integral_error: None,
            updates: self.updates,
        }
    }
}
