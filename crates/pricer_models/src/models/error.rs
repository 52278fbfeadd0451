//! Model parameter error types.

use pricer_core::types::PricingError;
use thiserror::Error;

/// Invalid model parameters.
///
/// # Examples
/// ```
/// use pricer_models::models::ModelError;
///
/// let err = ModelError::InvalidCorrelation(1.5);
/// assert_eq!(format!("{}", err), "Invalid correlation: rho = 1.5 (must lie in [-1, 1])");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Negative or non-finite volatility.
    #[error("Invalid volatility at index {index}: sigma = {value}")]
    InvalidVolatility {
        /// Position of the offending value
        index: usize,
        /// The invalid volatility
        value: f64,
    },

    /// Non-finite mean reversion.
    #[error("Invalid mean reversion: a = {0}")]
    InvalidMeanReversion(f64),

    /// Correlation outside [-1, 1].
    #[error("Invalid correlation: rho = {0} (must lie in [-1, 1])")]
    InvalidCorrelation(f64),

    /// Non-finite displacement.
    #[error("Invalid displacement at index {index}: d = {value}")]
    InvalidDisplacement {
        /// Rate index
        index: usize,
        /// The invalid displacement
        value: f64,
    },

    /// Segment or grid times not strictly increasing.
    #[error("Times not strictly increasing at index {index}: t = {time}")]
    NonIncreasingTimes {
        /// Position of the offending time
        index: usize,
        /// The offending time
        time: f64,
    },

    /// Non-positive or non-finite accrual factor.
    #[error("Invalid accrual factor at index {index}: delta = {value}")]
    InvalidAccrual {
        /// Rate index
        index: usize,
        /// The invalid accrual factor
        value: f64,
    },

    /// Vector lengths do not agree.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Which quantity
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Segment, block or factor index out of range.
    #[error("Index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        /// Which quantity
        what: &'static str,
        /// Requested index
        index: usize,
        /// Available length
        len: usize,
    },

    /// Time not on the model's rate grid.
    #[error("Time {time} is not on the rate grid (tolerance {tolerance})")]
    TimeNotOnGrid {
        /// Requested time
        time: f64,
        /// Matching tolerance
        tolerance: f64,
    },

    /// SABR parameter out of its domain.
    #[error("Invalid SABR parameter: {name} = {value}")]
    InvalidSabrParameter {
        /// Parameter name
        name: &'static str,
        /// The invalid value
        value: f64,
    },

    /// Forward or strike not positive where the lognormal formula needs it.
    #[error("Invalid {name} for lognormal SABR: {value}")]
    NonPositiveRate {
        /// `forward` or `strike`
        name: &'static str,
        /// The invalid value
        value: f64,
    },

    /// NaN or infinity in a model computation.
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

impl ModelError {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(what: &'static str, expected: usize, got: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            got,
        }
    }

    /// Returns true if the error comes from an out-of-range index.
    pub fn is_index_error(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. } | Self::TimeNotOnGrid { .. })
    }
}

impl From<ModelError> for PricingError {
    fn from(err: ModelError) -> Self {
        PricingError::InvalidInput(err.to_string())
    }
}

/// Check strictly increasing times.
pub(crate) fn check_increasing(times: &[f64]) -> Result<(), ModelError> {
    for (i, pair) in times.windows(2).enumerate() {
        if pair[1].is_nan() || pair[1] <= pair[0] {
            return Err(ModelError::NonIncreasingTimes {
                index: i + 1,
                time: pair[1],
            });
        }
    }
    Ok(())
}

/// Check non-negative finite volatilities; `offset` shifts reported indices.
pub(crate) fn check_volatilities(vols: &[f64], offset: usize) -> Result<(), ModelError> {
    match vols.iter().position(|v| !v.is_finite() || *v < 0.0) {
        Some(i) => Err(ModelError::InvalidVolatility {
            index: offset + i,
            value: vols[i],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_increasing() {
        assert!(check_increasing(&[0.0, 1.0, f64::INFINITY]).is_ok());
        assert_eq!(
            check_increasing(&[0.0, 1.0, 1.0]),
            Err(ModelError::NonIncreasingTimes { index: 2, time: 1.0 })
        );
    }

    #[test]
    fn test_check_volatilities() {
        assert!(check_volatilities(&[0.0, 0.01], 0).is_ok());
        assert!(matches!(
            check_volatilities(&[0.01, -0.01], 3),
            Err(ModelError::InvalidVolatility { index: 4, .. })
        ));
    }

    #[test]
    fn test_conversion_to_pricing_error() {
        let err: PricingError = ModelError::InvalidMeanReversion(f64::NAN).into();
        assert!(matches!(err, PricingError::InvalidInput(_)));
    }
}
