//! Explicit complementary orientation filter (Mahony AHRS).
//!
//! The error between measured and estimated reference directions (cross
//! product, summed over gravity and field) feeds back into the gyroscope
//! rate through a PI controller before integration. The integral term is
//! filter state and lives next to the quaternion.

use crate::error::{ensure_non_negative, ensure_positive, Result};
use crate::filters::ahrs::{
    earth_field_reference, identity, integrate, normalized, quat_derivative, quat_tuple,
    unit_or_none, OrientationFilter,
};
use crate::filters::check_sample;
use crate::types::{ImuSample, OrientationState, Quat, Vec3};

pub const DEFAULT_KP: f64 = 1.0;
pub const DEFAULT_KI: f64 = 0.0;

#[derive(Clone, Debug)]
pub struct Mahony {
    /// Orientation estimate (w, x, y, z)
    q: Quat,

    /// Integral feedback accumulator [rad/s]
    integral_error: Vec3,

    /// Proportional gain
    kp: f64,

    /// Integral gain
    ki: f64,

    /// Sample rate [Hz]
    sample_frequency: f64,

    updates: u64,
}

impl Mahony {
    pub fn new(kp: f64, ki: f64, sample_frequency: f64) -> Result<Self> {
        ensure_non_negative("kp", kp)?;
        ensure_non_negative("ki", ki)?;
        ensure_positive("sample_frequency", sample_frequency)?;
        log::debug!("mahony filter created: kp={kp}, ki={ki}, f={sample_frequency} Hz");
        Ok(Self {
            q: identity(),
            integral_error: Vec3::zeros(),
            kp,
            ki,
            sample_frequency,
            updates: 0,
        })
    }

    pub fn with_orientation(mut self, q: Quat) -> Result<Self> {
        self.q = normalized(q)?;
        Ok(self)
    }

    pub fn integral_error(&self) -> Vec3 {
        self.integral_error
    }

    pub fn gains(&self) -> (f64, f64) {
        (self.kp, self.ki)
    }

    pub fn set_gains(&mut self, kp: f64, ki: f64) -> Result<()> {
        ensure_non_negative("kp", kp)?;
        ensure_non_negative("ki", ki)?;
        self.kp = kp;
        self.ki = ki;
        if ki == 0.0 {
            self.integral_error = Vec3::zeros();
        }
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

    /// Summed direction error `a × v̂ (+ m × ŵ)` for unit measurements
    fn direction_error(&self, a: &Vec3, m: Option<&Vec3>) -> Vec3 {
        let (qw, qx, qy, qz) = quat_tuple(&self.q);

        // Estimated direction of gravity in the body frame
        let v = Vec3::new(
            2.0 * (qx * qz - qw * qy),
            2.0 * (qw * qx + qy * qz),
            qw * qw - qx * qx - qy * qy + qz * qz,
        );
        let mut error = a.cross(&v);

        if let Some(m) = m {
            let (bx, bz) = earth_field_reference(&self.q, m);
            // Estimated direction of the magnetic field in the body frame
            let w = Vec3::new(
                2.0 * bx * (0.5 - qy * qy - qz * qz) + 2.0 * bz * (qx * qz - qw * qy),
                2.0 * bx * (qx * qy - qw * qz) + 2.0 * bz * (qw * qx + qy * qz),
                2.0 * bx * (qw * qy + qx * qz) + 2.0 * bz * (0.5 - qx * qx - qy * qy),
            );
            error += m.cross(&w);
        }
        error
    }
}

impl OrientationFilter for Mahony {
    fn orientation(&self) -> Quat {
        self.q
    }

    fn set_orientation(&mut self, q: Quat) -> Result<()> {
        self.q = normalized(q)?;
        Ok(())
    }

    fn update(&mut self, sample: &ImuSample) -> Result<Quat> {
        check_sample(sample)?;

        let mut gyro = sample.gyro;

        match unit_or_none(&sample.accel) {
            Some(a) => {
                let m = sample.usable_mag().and_then(|m| unit_or_none(&m));
                let error = self.direction_error(&a, m.as_ref());

                if self.ki > 0.0 {
                    self.integral_error += self.ki * error / self.sample_frequency;
                    gyro += self.integral_error;
                } else {
                    // No integral action: keep the accumulator from winding up
                    self.integral_error = Vec3::zeros();
                }
                gyro += self.kp * error;
            }
            None => {
                log::trace!("zero accelerometer, gyroscope-only integration");
                if self.ki == 0.0 {
                    self.integral_error = Vec3::zeros();
                }
            }
        }

        let q_dot = quat_derivative(&self.q, &gyro);
        self.q = integrate(&self.q, &q_dot, self.sample_frequency);
        self.updates += 1;
        Ok(self.q)
    }

    fn reset(&mut self) {
        self.q = identity();
        self.integral_error = Vec3::zeros();
        self.updates = 0;
    }

    fn get_state(&self) -> OrientationState {
        let e = self.integral_error;
        OrientationState {
            quaternion: quat_tuple(&self.q),
            integral_error: Some((e.x, e.y, e.z)),
            updates: self.updates,
        }
    }
}
