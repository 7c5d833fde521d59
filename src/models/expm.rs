//! Matrix exponential for noise discretization.
//!
//! Delegates to nalgebra's scaling-and-squaring Padé implementation and adds
//! the shape and finiteness checks the builders rely on.

use crate::error::{EstimationError, Result};
use crate::types::StateMat;

/// Compute `exp(M)` for a square matrix.
pub fn matrix_exponential(m: &StateMat) -> Result<StateMat> {
    if !m.is_square() {
        return Err(EstimationError::shape(
            "matrix exponential",
            (m.nrows(), m.nrows()),
            m.shape(),
        ));
    }
    if m.iter().any(|v| !v.is_finite()) {
        return Err(EstimationError::Numerical(
            "matrix exponential input contains non-finite entries".to_string(),
        ));
    }

    let e = m.exp();
    if e.iter().any(|v| !v.is_finite()) {
        return Err(EstimationError::Numerical(format!(
            "matrix exponential overflowed (1-norm {:.3e})",
            one_norm(m)
        )));
    }
    Ok(e)
}

/// Maximum absolute column sum
pub fn one_norm(m: &StateMat) -> f64 {
    m.column_iter()
        .map(|col| col.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    #[test]
    fn test_zero_matrix_gives_identity() {
        let e = matrix_exponential(&DMatrix::zeros(4, 4)).unwrap();
        assert_relative_eq!(e, DMatrix::identity(4, 4), epsilon = 1e-14);
    }

    #[test]
    fn test_diagonal_matrix() {
        let m = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1.0, -2.0, 0.5]));
        let e = matrix_exponential(&m).unwrap();
        assert_relative_eq!(e[(0, 0)], 1.0f64.exp(), epsilon = 1e-12);
        assert_relative_eq!(e[(1, 1)], (-2.0f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(e[(2, 2)], 0.5f64.exp(), epsilon = 1e-12);
        assert_eq!(e[(0, 1)], 0.0);
    }

    #[test]
    fn test_nilpotent_matrix_is_exact_polynomial() {
        // [[0, t], [0, 0]] -> [[1, t], [0, 1]]
        let m = DMatrix::from_row_slice(2, 2, &[0.0, 3.0, 0.0, 0.0]);
        let e = matrix_exponential(&m).unwrap();
        assert_relative_eq!(e, DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 0.0, 1.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_generator() {
        // exp of skew generator is a planar rotation
        let theta = 1.2;
        let m = DMatrix::from_row_slice(2, 2, &[0.0, -theta, theta, 0.0]);
        let e = matrix_exponential(&m).unwrap();
        assert_relative_eq!(e[(0, 0)], theta.cos(), epsilon = 1e-12);
        assert_relative_eq!(e[(1, 0)], theta.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_stiff_matrix_stays_finite() {
        let m = DMatrix::from_row_slice(2, 2, &[-50.0, 49.0, 0.0, -1.0]);
        let e = matrix_exponential(&m).unwrap();
        assert_relative_eq!(e[(1, 1)], (-1.0f64).exp(), epsilon = 1e-10);
        assert!(e[(0, 0)].abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_square() {
        assert!(matrix_exponential(&DMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn test_one_norm() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, -4.0, -2.0, 1.0]);
        assert_eq!(one_norm(&m), 5.0);
    }
}
