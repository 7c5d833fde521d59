//! Linear discrete-time Kalman filter
//!
//! State Vector (m elements, commonly 9 for the constant-acceleration model):
//! [0-2]: Position, [3-5]: Velocity, [6-8]: Acceleration
//!
//! Measurement vector z has n elements, mapped from state space by H (n×m).
//! Each step is Predict then Update; both return a new `GaussianState`
//! instead of mutating the caller's estimate.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{EstimationError, Result};
use crate::types::{KalmanSnapshot, StateMat, StateVec};

/// Covariance update form applied after the gain is computed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceUpdate {
    /// `P = (I - K·H)·P`
    #[default]
    Standard,
    /// `P = (I - K·H)·P·(I - K·H)ᵀ + K·R·Kᵀ`
    Joseph,
}

/// State estimate paired with its covariance
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianState {
    pub xhat: StateVec,
    pub covariance: StateMat,
}

impl GaussianState {
    pub fn new(xhat: StateVec, covariance: StateMat) -> Result<Self> {
        let m = xhat.len();
        if covariance.shape() != (m, m) {
            return Err(EstimationError::shape("state covariance", (m, m), covariance.shape()));
        }
        Ok(Self { xhat, covariance })
    }

    /// Zero state with `variance·I` covariance
    pub fn with_variance(dim: usize, variance: f64) -> Self {
        Self {
            xhat: StateVec::zeros(dim),
            covariance: StateMat::identity(dim, dim) * variance,
        }
    }

    pub fn dim(&self) -> usize {
        self.xhat.len()
    }

    pub fn snapshot(&self) -> KalmanSnapshot {
        KalmanSnapshot {
            state: self.xhat.iter().copied().collect(),
            covariance_trace: self.covariance.trace(),
        }
    }
}

pub struct KalmanFilter {
    /// Transition matrix A [m×m]
    transition: StateMat,

    /// Process noise Q [m×m]
    process_noise: StateMat,

    /// Measurement matrix H [n×m]
    measurement_matrix: StateMat,

    /// Measurement noise R [n×n]
    measurement_noise: StateMat,

    covariance_update: CovarianceUpdate,
}

impl KalmanFilter {
    pub fn new(
        transition: StateMat,
        process_noise: StateMat,
        measurement_matrix: StateMat,
        measurement_noise: StateMat,
    ) -> Result<Self> {
        let m = transition.nrows();
        let n = measurement_matrix.nrows();
        if transition.shape() != (m, m) {
            return Err(EstimationError::shape("transition", (m, m), transition.shape()));
        }
        if process_noise.shape() != (m, m) {
            return Err(EstimationError::shape("process noise", (m, m), process_noise.shape()));
        }
        if measurement_matrix.shape() != (n, m) {
            return Err(EstimationError::shape(
                "measurement matrix",
                (n, m),
                measurement_matrix.shape(),
            ));
        }
        if measurement_noise.shape() != (n, n) {
            return Err(EstimationError::shape(
                "measurement noise",
                (n, n),
                measurement_noise.shape(),
            ));
        }

        log::debug!("kalman filter created: m={m}, n={n}");
        Ok(Self {
            transition,
            process_noise,
            measurement_matrix,
            measurement_noise,
            covariance_update: CovarianceUpdate::Standard,
        })
    }

    pub fn with_covariance_update(mut self, form: CovarianceUpdate) -> Self {
        self.covariance_update = form;
        self
    }

    pub fn state_dim(&self) -> usize {
        self.transition.nrows()
    }

    pub fn measurement_dim(&self) -> usize {
        self.measurement_matrix.nrows()
    }

    pub fn transition(&self) -> &StateMat {
        &self.transition
    }

    /// Replace A (e.g. after the sample interval changed)
    pub fn set_transition(&mut self, transition: StateMat) -> Result<()> {
        let m = self.state_dim();
        if transition.shape() != (m, m) {
            return Err(EstimationError::shape("transition", (m, m), transition.shape()));
        }
        self.transition = transition;
        Ok(())
    }

    /// Replace Q, keeping its dimension
    pub fn set_process_noise(&mut self, process_noise: StateMat) -> Result<()> {
        let m = self.state_dim();
        if process_noise.shape() != (m, m) {
            return Err(EstimationError::shape("process noise", (m, m), process_noise.shape()));
        }
        self.process_noise = process_noise;
        Ok(())
    }

    /// Predict: `xhat = A·xhat`, `P = A·P·Aᵀ + Q`
    pub fn predict(&self, state: &GaussianState) -> Result<GaussianState> {
        check_state(state, self.state_dim())?;
        let xhat = &self.transition * &state.xhat;
        let covariance = propagate_covariance(&self.transition, &state.covariance, &self.process_noise);
        Ok(GaussianState { xhat, covariance })
    }

    /// Update with measurement z (length n).
    ///
    /// `predicted` must come from `predict`; this does not apply A or Q.
    /// Use `step` for the full Predict + Update cycle.
    pub fn update(&self, predicted: &GaussianState, z: &StateVec) -> Result<GaussianState> {
        check_state(predicted, self.state_dim())?;
        check_measurement(z, self.measurement_dim())?;

        let innovation = z - &self.measurement_matrix * &predicted.xhat;
        correct(
            predicted,
            &innovation,
            &self.measurement_matrix,
            &self.measurement_noise,
            self.covariance_update,
        )
    }

    /// One full Predict + Update cycle
    pub fn step(&self, state: &GaussianState, z: &StateVec) -> Result<GaussianState> {
        let predicted = self.predict(state)?;
        self.update(&predicted, z)
    }
}

pub(crate) fn check_state(state: &GaussianState, m: usize) -> Result<()> {
    if state.xhat.len() != m {
        return Err(EstimationError::length("state vector", m, state.xhat.len()));
    }
    if state.covariance.shape() != (m, m) {
        return Err(EstimationError::shape("state covariance", (m, m), state.covariance.shape()));
    }
    Ok(())
}

pub(crate) fn check_measurement(z: &StateVec, n: usize) -> Result<()> {
    if z.len() != n {
        return Err(EstimationError::length("measurement vector", n, z.len()));
    }
    Ok(())
}

/// `A·P·Aᵀ + Q`
pub(crate) fn propagate_covariance(a: &StateMat, p: &StateMat, q: &StateMat) -> StateMat {
    a * p * a.transpose() + q
}

/// Measurement correction shared by the linear and extended filters.
pub(crate) fn correct(
    predicted: &GaussianState,
    innovation: &StateVec,
    h: &StateMat,
    r: &StateMat,
    form: CovarianceUpdate,
) -> Result<GaussianState> {
    let p = &predicted.covariance;
    let m = predicted.dim();

    // Innovation covariance: S = H·P·Hᵀ + R
    let ph_t = p * h.transpose();
    let s = h * &ph_t + r;

    // Kalman gain: K = P·Hᵀ·S⁻¹, solved as Kᵀ = S⁻¹·(P·Hᵀ)ᵀ
    let k = solve_innovation(&s, &ph_t.transpose())?.transpose();

    let xhat = &predicted.xhat + &k * innovation;

    let i_kh = DMatrix::<f64>::identity(m, m) - &k * h;
    let covariance = match form {
        CovarianceUpdate::Standard => &i_kh * p,
        CovarianceUpdate::Joseph => &i_kh * p * i_kh.transpose() + &k * r * k.transpose(),
    };
    let covariance = (&covariance + covariance.transpose()) * 0.5;

    Ok(GaussianState { xhat, covariance })
}

/// Solve `S·X = rhs` with Cholesky, falling back to LU.
fn solve_innovation(s: &StateMat, rhs: &StateMat) -> Result<StateMat> {
    let solution = match s.clone().cholesky() {
        Some(chol) => chol.solve(rhs),
        None => {
            log::warn!("innovation covariance is not positive definite, solving with LU");
            s.clone()
                .lu()
                .solve(rhs)
                .ok_or(EstimationError::SingularMatrix("innovation covariance"))?
        }
    };
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(EstimationError::SingularMatrix("innovation covariance"));
    }
    Ok(solution)
}
