//! Market data error types.

use crate::types::PricingError;
use thiserror::Error;

/// Market data operation errors.
///
/// # Variants
///
/// - `InvalidMaturity`: Negative or otherwise unusable time
/// - `InvalidAccrual`: Non-positive accrual factor for a forward lookup
/// - `InsufficientData`: Not enough pillars for construction
/// - `UnsortedPillars`: Pillar times not strictly increasing
/// - `InvalidDiscountFactor`: Non-positive or non-finite pillar discount factor
///
/// # Examples
///
/// ```
/// use pricer_core::market_data::MarketDataError;
///
/// let err = MarketDataError::InvalidMaturity { t: -1.0 };
/// assert!(format!("{}", err).contains("-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Invalid maturity (negative time).
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid maturity value
        t: f64,
    },

    /// Accrual factor must be positive.
    #[error("Invalid accrual factor: {accrual}")]
    InvalidAccrual {
        /// The invalid accrual factor
        accrual: f64,
    },

    /// Insufficient data for construction.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Pillars are not strictly increasing.
    #[error("Pillar times must be strictly increasing (index {index})")]
    UnsortedPillars {
        /// First offending index
        index: usize,
    },

    /// Pillar discount factor is not positive and finite.
    #[error("Invalid discount factor {df} at t = {t}")]
    InvalidDiscountFactor {
        /// Pillar time
        t: f64,
        /// Offending value
        df: f64,
    },
}

impl From<MarketDataError> for PricingError {
    fn from(err: MarketDataError) -> Self {
        PricingError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = MarketDataError::InvalidMaturity { t: -1.5 };
        assert_eq!(format!("{}", err), "Invalid maturity: t = -1.5");

        let err = MarketDataError::InsufficientData { got: 1, need: 2 };
        assert_eq!(format!("{}", err), "Insufficient data: got 1, need 2");

        let err = MarketDataError::InvalidDiscountFactor { t: 2.0, df: -0.1 };
        assert!(format!("{}", err).contains("-0.1"));
    }

    #[test]
    fn test_into_pricing_error() {
        let pricing_err: PricingError = MarketDataError::InvalidAccrual { accrual: 0.0 }.into();
        match pricing_err {
            PricingError::InvalidInput(msg) => assert!(msg.contains("accrual")),
            _ => panic!("Expected InvalidInput variant"),
        }
    }
}
