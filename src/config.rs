use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, EstimationError, Result};
use crate::filters::{CovarianceUpdate, KalmanFilter, Madgwick, Mahony, OrientationFilter};
use crate::models::{build_measurement_noise, build_model, build_process_noise, build_transition};
use crate::types::{StateMat, STATE_DIM_CA};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AhrsAlgorithm {
    #[default]
    Madgwick,
    Mahony,
}

/// Orientation filter tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AhrsConfig {
    pub algorithm: AhrsAlgorithm,

    /// Gradient-descent step magnitude (Madgwick)
    pub beta: f64,

    /// Proportional gain (Mahony)
    pub kp: f64,

    /// Integral gain (Mahony); 0 disables integral feedback
    pub ki: f64,

    /// Sample rate [Hz]
    pub sample_frequency: f64,
}

impl Default for AhrsConfig {
    fn default() -> Self {
        Self {
            algorithm: AhrsAlgorithm::Madgwick,
            beta: crate::filters::madgwick::DEFAULT_BETA,
            kp: crate::filters::mahony::DEFAULT_KP,
            ki: crate::filters::mahony::DEFAULT_KI,
            sample_frequency: 100.0,
        }
    }
}

impl AhrsConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("ahrs.beta", self.beta)?;
        ensure_non_negative("ahrs.kp", self.kp)?;
        ensure_non_negative("ahrs.ki", self.ki)?;
        ensure_positive("ahrs.sample_frequency", self.sample_frequency)
    }

    /// Fresh filter instance for one sensor stream
    pub fn build_filter(&self) -> Result<Box<dyn OrientationFilter + Send>> {
        self.validate()?;
        Ok(match self.algorithm {
            AhrsAlgorithm::Madgwick => Box::new(Madgwick::new(self.beta, self.sample_frequency)?),
            AhrsAlgorithm::Mahony => Box::new(Mahony::new(self.kp, self.ki, self.sample_frequency)?),
        })
    }
}

/// Constant-acceleration Kalman filter tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Sample interval [s]
    pub dt: f64,

    /// Continuous white-noise spectral density per state (9 values)
    pub spectral_densities: Vec<f64>,

    /// Sensor variance per measured signal
    pub measurement_variances: Vec<f64>,

    pub covariance_update: CovarianceUpdate,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            spectral_densities: vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5],
            measurement_variances: vec![0.01; 3],
            covariance_update: CovarianceUpdate::Standard,
        }
    }
}

impl KalmanConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("kalman.dt", self.dt)?;
        if self.spectral_densities.len() != STATE_DIM_CA {
            return Err(EstimationError::Config(format!(
                "kalman.spectral_densities needs {STATE_DIM_CA} values, got {}",
                self.spectral_densities.len()
            )));
        }
        if self.measurement_variances.is_empty() {
            return Err(EstimationError::Config(
                "kalman.measurement_variances must not be empty".to_string(),
            ));
        }
        for &qc in &self.spectral_densities {
            ensure_non_negative("kalman.spectral_densities", qc)?;
        }
        for &var in &self.measurement_variances {
            ensure_non_negative("kalman.measurement_variances", var)?;
        }
        Ok(())
    }

    /// Build the constant-acceleration filter for measurement matrix `h` (n×9)
    pub fn constant_acceleration_filter(&self, h: StateMat) -> Result<KalmanFilter> {
        self.validate()?;
        let n = self.measurement_variances.len();
        if h.shape() != (n, STATE_DIM_CA) {
            return Err(EstimationError::shape("measurement matrix", (n, STATE_DIM_CA), h.shape()));
        }

        let a = build_transition(self.dt)?;
        let f = build_model(self.dt)?;
        let q = build_process_noise(&self.spectral_densities, &f, self.dt)?;
        let r = build_measurement_noise(&self.measurement_variances)?;
        Ok(KalmanFilter::new(a, q, h, r)?.with_covariance_update(self.covariance_update))
    }

    /// H selecting the position block (3×9)
    pub fn position_measurement_matrix() -> StateMat {
        let mut h = StateMat::zeros(3, STATE_DIM_CA);
        for i in 0..3 {
            h[(i, i)] = 1.0;
        }
        h
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub ahrs: AhrsConfig,
    pub kalman: KalmanConfig,
}

impl EstimatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EstimationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EstimationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.ahrs.validate()?;
        self.kalman.validate()
    }
}
