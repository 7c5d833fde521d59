//! Noise covariance builders (R from variances, Q via Van Loan discretization).

use nalgebra::{DMatrix, DVector};

use super::expm::matrix_exponential;
use crate::error::{ensure_non_negative, ensure_positive, EstimationError, Result};
use crate::types::StateMat;

/// Build the n×n sensor noise covariance R from per-signal variances.
pub fn build_measurement_noise(variances: &[f64]) -> Result<StateMat> {
    if variances.is_empty() {
        return Err(EstimationError::InvalidParameter(
            "measurement noise needs at least one variance".to_string(),
        ));
    }
    for (i, &var) in variances.iter().enumerate() {
        ensure_non_negative(&format!("variance[{i}]"), var)?;
    }
    Ok(DMatrix::from_diagonal(&DVector::from_column_slice(variances)))
}

/// Discretize continuous white-noise spectral densities into the m×m
/// process noise Q for model matrix `f` and interval `dt`.
///
/// Matrix fraction form:
/// `Φ = [[F, Qc], [0, -Fᵀ]]`, `[C; D] = exp(Φ·dt)·[0; I]`, `Q = C·D⁻¹`.
pub fn build_process_noise(spectral_densities: &[f64], f: &StateMat, dt: f64) -> Result<StateMat> {
    ensure_positive("dt", dt)?;
    let m = spectral_densities.len();
    if m == 0 {
        return Err(EstimationError::InvalidParameter(
            "process noise needs at least one spectral density".to_string(),
        ));
    }
    if f.shape() != (m, m) {
        return Err(EstimationError::shape("process noise model", (m, m), f.shape()));
    }
    for (i, &qc) in spectral_densities.iter().enumerate() {
        ensure_non_negative(&format!("spectral_density[{i}]"), qc)?;
    }

    let qc = DMatrix::from_diagonal(&DVector::from_column_slice(spectral_densities));

    let mut phi = DMatrix::<f64>::zeros(2 * m, 2 * m);
    phi.view_mut((0, 0), (m, m)).copy_from(f);
    phi.view_mut((0, m), (m, m)).copy_from(&qc);
    phi.view_mut((m, m), (m, m)).copy_from(&(-f.transpose()));

    let e = matrix_exponential(&(phi * dt))?;
    let c = e.view((0, m), (m, m)).into_owned();
    let d = e.view((m, m), (m, m)).into_owned();

    // Q·D = C  <=>  Dᵀ·Qᵀ = Cᵀ
    let q_t = d
        .transpose()
        .lu()
        .solve(&c.transpose())
        .ok_or(EstimationError::SingularMatrix("Van Loan denominator block"))?;

    let q = q_t.transpose();
    let q = (&q + q.transpose()) * 0.5;
    log::debug!("discretized process noise for m={m}, dt={dt}");
    Ok(q)
}
