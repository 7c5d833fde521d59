use thiserror::Error;

/// Estimation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(&'static str),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Degenerate measurement: {0}")]
    DegenerateMeasurement(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for estimation operations
pub type Result<T> = std::result::Result<T, EstimationError>;

impl EstimationError {
    pub(crate) fn shape(
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        EstimationError::DimensionMismatch {
            context,
            expected: format!("{}x{}", expected.0, expected.1),
            found: format!("{}x{}", found.0, found.1),
        }
    }

    pub(crate) fn length(context: &'static str, expected: usize, found: usize) -> Self {
        EstimationError::DimensionMismatch {
            context,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Reject non-finite or non-positive scalars (sample interval, frequency)
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EstimationError::InvalidParameter(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

/// Reject non-finite or negative scalars (gains, variances)
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EstimationError::InvalidParameter(format!(
            "{name} must be a non-negative finite number, got {value}"
        )))
    }
}
