//! State estimation for inertial motion tracking.
//!
//! - `filters`: linear/extended Kalman filters and the Madgwick/Mahony
//!   quaternion orientation filters
//! - `models`: transition, model and noise matrix builders (Van Loan
//!   discretization)
//! - `kinematics`: rotation, quaternion and homogeneous transform helpers
//! - `batch`: whole-recording processing over ndarray matrices

pub mod batch;
pub mod config;
pub mod error;
pub mod filters;
pub mod kinematics;
pub mod models;
pub mod types;

pub use config::{AhrsAlgorithm, AhrsConfig, EstimatorConfig, KalmanConfig};
pub use error::{EstimationError, Result};
pub use filters::{
    CovarianceUpdate, ExtendedKalmanFilter, GaussianState, KalmanFilter, Madgwick, Mahony,
    NonlinearModel, OrientationFilter,
};
pub use types::{ImuSample, OrientationState, Quat, Rot3, Vec3};
