//! Rigid body kinematics
//!
//! Stateless conversions between Euler angles, rotation matrices,
//! quaternions and homogeneous transforms, plus the cold-start attitude
//! estimate that seeds the orientation filters.

pub mod init_pose;
pub mod rotation;
pub mod transform;

pub use init_pose::{accel_mag_to_euler, accel_mag_to_quaternion};
pub use rotation::{
    chordal_distance, euler_to_quaternion, euler_to_rotation, is_rotation, quaternion_to_rotation,
    rotation_to_quaternion, MAX_CHORDAL_DISTANCE,
};
pub use transform::{compose_transform, invert_transform, rotation_part, translation_part};
