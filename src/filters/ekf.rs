//! Extended Kalman filter
//!
//! The caller supplies the nonlinear transition f(x) and observation h(x)
//! together with their Jacobians through `NonlinearModel`; the filter
//! linearizes at the prior estimate for Predict and at the predicted
//! estimate for Update.

use crate::error::{EstimationError, Result};
use crate::filters::kalman::{
    check_measurement, check_state, correct, propagate_covariance, CovarianceUpdate, GaussianState,
};
use crate::types::{StateMat, StateVec};

pub trait NonlinearModel {
    /// State dimension m
    fn state_dim(&self) -> usize;

    /// Measurement dimension n
    fn measurement_dim(&self) -> usize;

    /// x_k = f(x_{k-1})
    fn transition(&self, state: &StateVec) -> StateVec;

    /// ∂f/∂x evaluated at `state` [m×m]
    fn transition_jacobian(&self, state: &StateVec) -> StateMat;

    /// z = h(x)
    fn observation(&self, state: &StateVec) -> StateVec;

    /// ∂h/∂x evaluated at `state` [n×m]
    fn observation_jacobian(&self, state: &StateVec) -> StateMat;

    /// Process noise coupling W [m×q]; identity when `None`
    fn process_noise_coupling(&self, _state: &StateVec) -> Option<StateMat> {
        None
    }

    /// Measurement noise coupling V [n×r]; identity when `None`
    fn measurement_noise_coupling(&self, _state: &StateVec) -> Option<StateMat> {
        None
    }
}

pub struct ExtendedKalmanFilter<M: NonlinearModel> {
    model: M,

    /// Process noise Q [q×q]
    process_noise: StateMat,

    /// Measurement noise R [r×r]
    measurement_noise: StateMat,

    covariance_update: CovarianceUpdate,
}

impl<M: NonlinearModel> ExtendedKalmanFilter<M> {
    pub fn new(model: M, process_noise: StateMat, measurement_noise: StateMat) -> Result<Self> {
        if !process_noise.is_square() {
            return Err(EstimationError::shape(
                "process noise",
                (process_noise.nrows(), process_noise.nrows()),
                process_noise.shape(),
            ));
        }
        if !measurement_noise.is_square() {
            return Err(EstimationError::shape(
                "measurement noise",
                (measurement_noise.nrows(), measurement_noise.nrows()),
                measurement_noise.shape(),
            ));
        }
        log::debug!(
            "extended kalman filter created: m={}, n={}",
            model.state_dim(),
            model.measurement_dim()
        );
        Ok(Self {
            model,
            process_noise,
            measurement_noise,
            covariance_update: CovarianceUpdate::Standard,
        })
    }

    pub fn with_covariance_update(mut self, form: CovarianceUpdate) -> Self {
        self.covariance_update = form;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Predict: `xhat = f(xhat)`, `P = A·P·Aᵀ + W·Q·Wᵀ`
    pub fn predict(&self, state: &GaussianState) -> Result<GaussianState> {
        let m = self.model.state_dim();
        check_state(state, m)?;

        let a = self.model.transition_jacobian(&state.xhat);
        if a.shape() != (m, m) {
            return Err(EstimationError::shape("transition jacobian", (m, m), a.shape()));
        }
        let q = self.coupled_process_noise(&state.xhat, m)?;

        let xhat = self.model.transition(&state.xhat);
        if xhat.len() != m {
            return Err(EstimationError::length("transition output", m, xhat.len()));
        }
        let covariance = propagate_covariance(&a, &state.covariance, &q);
        Ok(GaussianState { xhat, covariance })
    }

    /// Update: innovation `z - h(xhat)` with H linearized at the prediction
    pub fn update(&self, predicted: &GaussianState, z: &StateVec) -> Result<GaussianState> {
        let m = self.model.state_dim();
        let n = self.model.measurement_dim();
        check_state(predicted, m)?;
        check_measurement(z, n)?;

        let h = self.model.observation_jacobian(&predicted.xhat);
        if h.shape() != (n, m) {
            return Err(EstimationError::shape("observation jacobian", (n, m), h.shape()));
        }
        let expected = self.model.observation(&predicted.xhat);
        if expected.len() != n {
            return Err(EstimationError::length("observation output", n, expected.len()));
        }
        let r = self.coupled_measurement_noise(&predicted.xhat, n)?;

        let innovation = z - expected;
        correct(predicted, &innovation, &h, &r, self.covariance_update)
    }

    pub fn step(&self, state: &GaussianState, z: &StateVec) -> Result<GaussianState> {
        let predicted = self.predict(state)?;
        self.update(&predicted, z)
    }

    fn coupled_process_noise(&self, state: &StateVec, m: usize) -> Result<StateMat> {
        let q = &self.process_noise;
        match self.model.process_noise_coupling(state) {
            Some(w) => {
                if w.shape() != (m, q.nrows()) {
                    return Err(EstimationError::shape("process noise coupling", (m, q.nrows()), w.shape()));
                }
                Ok(&w * q * w.transpose())
            }
            None if q.nrows() == m => Ok(q.clone()),
            None => Err(EstimationError::shape("process noise", (m, m), q.shape())),
        }
    }

    fn coupled_measurement_noise(&self, state: &StateVec, n: usize) -> Result<StateMat> {
        let r = &self.measurement_noise;
        match self.model.measurement_noise_coupling(state) {
            Some(v) => {
                if v.shape() != (n, r.nrows()) {
                    return Err(EstimationError::shape(
                        "measurement noise coupling",
                        (n, r.nrows()),
                        v.shape(),
                    ));
                }
                Ok(&v * r * v.transpose())
            }
            None if r.nrows() == n => Ok(r.clone()),
            None => Err(EstimationError::shape("measurement noise", (n, n), r.shape())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::kalman::KalmanFilter;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    /// Linear model expressed through the nonlinear interface
    struct Linear {
        a: StateMat,
        h: StateMat,
    }

    impl NonlinearModel for Linear {
        fn state_dim(&self) -> usize {
            self.a.nrows()
        }
        fn measurement_dim(&self) -> usize {
            self.h.nrows()
        }
        fn transition(&self, state: &StateVec) -> StateVec {
            &self.a * state
        }
        fn transition_jacobian(&self, _state: &StateVec) -> StateMat {
            self.a.clone()
        }
        fn observation(&self, state: &StateVec) -> StateVec {
            &self.h * state
        }
        fn observation_jacobian(&self, _state: &StateVec) -> StateMat {
            self.h.clone()
        }
    }

    /// Planar position [x, y] observed as range from a beacon at the origin
    struct RangeOnly;

    impl NonlinearModel for RangeOnly {
        fn state_dim(&self) -> usize {
            2
        }
        fn measurement_dim(&self) -> usize {
            1
        }
        fn transition(&self, state: &StateVec) -> StateVec {
            state.clone()
        }
        fn transition_jacobian(&self, _state: &StateVec) -> StateMat {
            DMatrix::identity(2, 2)
        }
        fn observation(&self, state: &StateVec) -> StateVec {
            StateVec::from_element(1, state.norm())
        }
        fn observation_jacobian(&self, state: &StateVec) -> StateMat {
            let range = state.norm().max(1e-9);
            DMatrix::from_row_slice(1, 2, &[state[0] / range, state[1] / range])
        }
    }

    #[test]
    fn test_linear_model_matches_kalman_filter() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.1, 0.0, 1.0]);
        let h = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let q = DMatrix::identity(2, 2) * 0.01;
        let r = DMatrix::from_element(1, 1, 0.25);

        let kf = KalmanFilter::new(a.clone(), q.clone(), h.clone(), r.clone()).unwrap();
        let ekf = ExtendedKalmanFilter::new(Linear { a, h }, q, r).unwrap();

        let mut s_kf = GaussianState::with_variance(2, 1.0);
        let mut s_ekf = s_kf.clone();
        for i in 0..20 {
            let z = StateVec::from_element(1, i as f64 * 0.3);
            s_kf = kf.step(&s_kf, &z).unwrap();
            s_ekf = ekf.step(&s_ekf, &z).unwrap();
        }
        assert_relative_eq!(s_kf.xhat, s_ekf.xhat, epsilon = 1e-10);
        assert_relative_eq!(s_kf.covariance, s_ekf.covariance, epsilon = 1e-10);
    }

    #[test]
    fn test_range_measurement_moves_along_bearing() {
        let ekf = ExtendedKalmanFilter::new(
            RangeOnly,
            DMatrix::zeros(2, 2),
            DMatrix::from_element(1, 1, 0.01),
        )
        .unwrap();

        let mut state = GaussianState::new(
            StateVec::from_vec(vec![3.0, 4.0]),
            DMatrix::identity(2, 2),
        )
        .unwrap();

        // True range 10 along the same bearing
        for _ in 0..10 {
            state = ekf.step(&state, &StateVec::from_element(1, 10.0)).unwrap();
        }
        assert_relative_eq!(state.xhat.norm(), 10.0, epsilon = 0.05);
        assert_relative_eq!(state.xhat[1] / state.xhat[0], 4.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_noise_coupling_shapes_are_checked() {
        struct Coupled;
        impl NonlinearModel for Coupled {
            fn state_dim(&self) -> usize {
                2
            }
            fn measurement_dim(&self) -> usize {
                1
            }
            fn transition(&self, state: &StateVec) -> StateVec {
                state.clone()
            }
            fn transition_jacobian(&self, _state: &StateVec) -> StateMat {
                DMatrix::identity(2, 2)
            }
            fn observation(&self, state: &StateVec) -> StateVec {
                StateVec::from_element(1, state[0])
            }
            fn observation_jacobian(&self, _state: &StateVec) -> StateMat {
                DMatrix::from_row_slice(1, 2, &[1.0, 0.0])
            }
            fn process_noise_coupling(&self, _state: &StateVec) -> Option<StateMat> {
                // Single scalar disturbance driving both states
                Some(DMatrix::from_row_slice(2, 1, &[0.5, 1.0]))
            }
        }

        let ekf = ExtendedKalmanFilter::new(
            Coupled,
            DMatrix::from_element(1, 1, 4.0),
            DMatrix::from_element(1, 1, 1.0),
        )
        .unwrap();
        let predicted = ekf.predict(&GaussianState::with_variance(2, 0.0)).unwrap();
        // W·Q·Wᵀ = 4 · [[0.25, 0.5], [0.5, 1]]
        assert_relative_eq!(
            predicted.covariance,
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]),
            epsilon = 1e-12
        );

        let bad = ExtendedKalmanFilter::new(
            RangeOnly,
            DMatrix::identity(3, 3),
            DMatrix::from_element(1, 1, 1.0),
        )
        .unwrap();
        assert!(bad.predict(&GaussianState::with_variance(2, 1.0)).is_err());
    }

    #[test]
    fn test_measurement_noise_coupling() {
        /// Both position sensors share one disturbance source
        struct SharedNoise {
            coupling: StateMat,
        }
        impl NonlinearModel for SharedNoise {
            fn state_dim(&self) -> usize {
                2
            }
            fn measurement_dim(&self) -> usize {
                2
            }
            fn transition(&self, state: &StateVec) -> StateVec {
                state.clone()
            }
            fn transition_jacobian(&self, _state: &StateVec) -> StateMat {
                DMatrix::identity(2, 2)
            }
            fn observation(&self, state: &StateVec) -> StateVec {
                state.clone()
            }
            fn observation_jacobian(&self, _state: &StateVec) -> StateMat {
                DMatrix::identity(2, 2)
            }
            fn measurement_noise_coupling(&self, _state: &StateVec) -> Option<StateMat> {
                Some(self.coupling.clone())
            }
        }

        let ekf = ExtendedKalmanFilter::new(
            SharedNoise {
                coupling: DMatrix::from_row_slice(2, 1, &[1.0, 1.0]),
            },
            DMatrix::zeros(2, 2),
            DMatrix::from_element(1, 1, 1.0),
        )
        .unwrap();
        let prior = GaussianState::with_variance(2, 1.0);
        let z = StateVec::from_vec(vec![1.0, 1.0]);

        // S = I + V·R·Vᵀ = [[2, 1], [1, 2]], K = S⁻¹ = [[2, -1], [-1, 2]] / 3, P = I - K
        let updated = ekf.update(&prior, &z).unwrap();
        assert_relative_eq!(updated.xhat, StateVec::from_vec(vec![1.0 / 3.0, 1.0 / 3.0]), epsilon = 1e-12);
        assert_relative_eq!(
            updated.covariance,
            DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]) / 3.0,
            epsilon = 1e-12
        );

        let wrong = ExtendedKalmanFilter::new(
            SharedNoise {
                coupling: DMatrix::identity(2, 2),
            },
            DMatrix::zeros(2, 2),
            DMatrix::from_element(1, 1, 1.0),
        )
        .unwrap();
        let err = wrong.update(&prior, &z).unwrap_err();
        assert!(matches!(err, EstimationError::DimensionMismatch { .. }));
    }
}
