use thiserror::Error;

use crate::photometry::sensitivity::SensitivityError;
use crate::units::Dimension;

/// Errors produced by the radiometric forward model and the inverse fit.
#[derive(Error, Debug)]
pub enum RadiometryError {
    /// A physical input is outside its domain (non-positive temperature,
    /// negative distance ratio, zero exposure, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A configured quantity carries a unit of the wrong dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension the consumer requires.
        expected: Dimension,
        /// Dimension of the unit that was supplied.
        found: Dimension,
    },

    /// The sensitivity table could not be loaded.
    #[error("calibration table load failed: {0}")]
    CalibrationLoad(#[from] SensitivityError),

    /// The optimizer stopped without meeting any of its convergence criteria.
    #[error("fit did not converge after {iterations} iterations (cost {cost:.3e})")]
    FitDidNotConverge {
        /// Iterations performed before giving up.
        iterations: usize,
        /// Half the squared residual norm at the last accepted iterate.
        cost: f64,
    },

    /// Calibration constants file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RadiometryError>;

/// Reject values that are not finite and strictly positive.
pub(crate) fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RadiometryError::InvalidParameter(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

/// Reject values that are not finite and non-negative.
pub(crate) fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RadiometryError::InvalidParameter(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}
