//! Linear algebra type system for the estimation core
//!
//! Fixed-size aliases for the orientation filters and kinematics, dynamic
//! aliases for the Kalman family whose state size is a runtime value.

use nalgebra::{DMatrix, DVector, SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM_CA: usize = 9; // constant-acceleration model: pos, vel, acc per axis
pub const AXES: usize = 3;

// ===== Orientation Dimensions =====
pub const QUAT_DIM: usize = 4; // (w, x, y, z)
pub const MEASURE_DIM_IMU: usize = 3; // gravity direction only
pub const MEASURE_DIM_MARG: usize = 6; // gravity + magnetic field direction

// ===== Kinematics Types =====
pub type Vec3 = SVector<f64, 3>;
pub type Quat = SVector<f64, QUAT_DIM>;
pub type Rot3 = SMatrix<f64, 3, 3>;
pub type Transform4 = SMatrix<f64, 4, 4>;

// Objective function and Jacobian types for gradient-descent AHRS
pub type ObjectiveImu = SVector<f64, MEASURE_DIM_IMU>;
pub type JacobianImu = SMatrix<f64, MEASURE_DIM_IMU, QUAT_DIM>; // 3×4
pub type ObjectiveMarg = SVector<f64, MEASURE_DIM_MARG>;
pub type JacobianMarg = SMatrix<f64, MEASURE_DIM_MARG, QUAT_DIM>; // 6×4

// ===== Kalman Types =====
pub type StateVec = DVector<f64>;
pub type StateMat = DMatrix<f64>;
