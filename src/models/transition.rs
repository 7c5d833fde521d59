//! Constant-acceleration model matrices.
//!
//! State layout (9D):
//! [0-2]: Position (X, Y, Z)
//! [3-5]: Velocity (Vx, Vy, Vz)
//! [6-8]: Acceleration (Ax, Ay, Az)

use nalgebra::DMatrix;

use crate::error::{ensure_positive, Result};
use crate::types::{StateMat, AXES, STATE_DIM_CA};

/// Write `value * I3` into the 3×3 block at block coordinates (row, col)
fn set_block(m: &mut StateMat, block_row: usize, block_col: usize, value: f64) {
    for i in 0..AXES {
        m[(block_row * AXES + i, block_col * AXES + i)] = value;
    }
}

/// Build the 9×9 transition matrix A for a sample interval `dt`.
///
/// ```text
/// | I  dt·I  ½dt²·I |
/// | 0   I     dt·I  |
/// | 0   0      I    |
/// ```
pub fn build_transition(dt: f64) -> Result<StateMat> {
    ensure_positive("dt", dt)?;

    let mut a = DMatrix::<f64>::identity(STATE_DIM_CA, STATE_DIM_CA);
    set_block(&mut a, 0, 1, dt);
    set_block(&mut a, 0, 2, 0.5 * dt * dt);
    set_block(&mut a, 1, 2, dt);

    log::debug!("built constant-acceleration transition for dt={dt}");
    Ok(a)
}

/// Build the 9×9 model matrix F used for noise discretization.
///
/// ```text
/// | 0  I  dt·I |
/// | 0  0   I   |
/// | 0  0   0   |
/// ```
pub fn build_model(dt: f64) -> Result<StateMat> {
    ensure_positive("dt", dt)?;

    let mut f = DMatrix::<f64>::zeros(STATE_DIM_CA, STATE_DIM_CA);
    set_block(&mut f, 0, 1, 1.0);
    set_block(&mut f, 0, 2, dt);
    set_block(&mut f, 1, 2, 1.0);
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn test_transition_kinematics() {
        let dt = 0.1;
        let a = build_transition(dt).unwrap();

        // x = 1, v = 2, a = 3 on every axis
        let mut x = DVector::<f64>::zeros(9);
        for i in 0..3 {
            x[i] = 1.0;
            x[3 + i] = 2.0;
            x[6 + i] = 3.0;
        }
        let next = &a * &x;
        for i in 0..3 {
            assert_relative_eq!(next[i], 1.0 + 2.0 * dt + 0.5 * 3.0 * dt * dt, epsilon = 1e-12);
            assert_relative_eq!(next[3 + i], 2.0 + 3.0 * dt, epsilon = 1e-12);
            assert_relative_eq!(next[6 + i], 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_transition_axes_decoupled() {
        let a = build_transition(0.5).unwrap();
        // Position X must not depend on velocity Y
        assert_eq!(a[(0, 4)], 0.0);
        assert_eq!(a[(1, 3)], 0.0);
        assert_eq!(a[(2, 2)], 1.0);
    }

    #[test]
    fn test_model_has_no_half_dt_squared() {
        let dt = 0.2;
        let f = build_model(dt).unwrap();
        assert_eq!(f[(0, 0)], 0.0);
        assert_eq!(f[(0, 3)], 1.0);
        assert_relative_eq!(f[(0, 6)], dt);
        assert_eq!(f[(3, 6)], 1.0);
        assert_eq!(f.row(8).sum(), 0.0);
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        assert!(build_transition(0.0).is_err());
        assert!(build_transition(-0.01).is_err());
        assert!(build_model(f64::NAN).is_err());
    }
}
