//! Model matrix builders for the Kalman filters
//!
//! Constant-acceleration transition/model matrices, sensor and process noise
//! covariances, and the matrix exponential used to discretize them.

pub mod expm;
pub mod noise;
pub mod transition;

pub use expm::matrix_exponential;
pub use noise::{build_measurement_noise, build_process_noise};
pub use transition::{build_model, build_transition};
