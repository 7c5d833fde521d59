//! State estimators
//!
//! Linear and extended Kalman filters over dynamic-size state, and the two
//! quaternion orientation filter families (gradient descent, explicit
//! complementary) behind the `OrientationFilter` trait.

use crate::error::{EstimationError, Result};
use crate::types::ImuSample;

pub mod ahrs;
pub mod ekf;
pub mod kalman;
pub mod madgwick;
pub mod mahony;

pub use ahrs::OrientationFilter;
pub use ekf::{ExtendedKalmanFilter, NonlinearModel};
pub use kalman::{CovarianceUpdate, GaussianState, KalmanFilter};
pub use madgwick::Madgwick;
pub use mahony::Mahony;

/// Reject samples carrying NaN or infinite components
pub(crate) fn check_sample(sample: &ImuSample) -> Result<()> {
    let finite = sample.gyro.iter().all(|v| v.is_finite())
        && sample.accel.iter().all(|v| v.is_finite())
        && sample
            .mag
            .map_or(true, |m| m.iter().all(|v| v.is_finite()));
    if finite {
        Ok(())
    } else {
        Err(EstimationError::InvalidParameter(
            "sensor sample contains non-finite values".to_string(),
        ))
    }
}
