//! Error types for structured error handling.
//!
//! This module provides:
//! - `PricingError`: Errors from pricing operations
//! - `SolverError`: Errors from bracketing, root-finding and least-squares solvers

use std::fmt;
use thiserror::Error;

/// Categorised pricing errors.
///
/// Provides structured error handling for pricing operations with
/// descriptive context for each failure mode.
///
/// # Variants
/// - `InvalidInput`: Invalid market data or parameters
/// - `NumericalInstability`: Computation failed to converge
/// - `ModelFailure`: Model assumptions violated
/// - `UnsupportedInstrument`: Instrument not compatible with the model
///
/// # Examples
/// ```
/// use pricer_core::types::PricingError;
///
/// let err = PricingError::InvalidInput("Negative notional".to_string());
/// assert_eq!(format!("{}", err), "Invalid input: Negative notional");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Invalid input data or parameters
    InvalidInput(String),

    /// Numerical instability during computation
    NumericalInstability(String),

    /// Model failed to produce valid result
    ModelFailure(String),

    /// Instrument not compatible with the model parametrisation
    UnsupportedInstrument(String),
}

impl PricingError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a model failure error.
    pub fn model_failure(message: impl Into<String>) -> Self {
        Self::ModelFailure(message.into())
    }
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            PricingError::NumericalInstability(msg) => {
                write!(f, "Numerical instability: {}", msg)
            }
            PricingError::ModelFailure(msg) => write!(f, "Model failure: {}", msg),
            PricingError::UnsupportedInstrument(msg) => {
                write!(f, "Unsupported instrument: {}", msg)
            }
        }
    }
}

impl std::error::Error for PricingError {}

impl From<SolverError> for PricingError {
    fn from(err: SolverError) -> Self {
        PricingError::NumericalInstability(err.to_string())
    }
}

/// Numerical solver errors.
///
/// Covers the three solver families used by calibration: geometric root
/// bracketing, Brent root finding and damped least squares.
///
/// # Variants
/// - `NoBracket`: Function values at the endpoints handed to Brent have the same sign
/// - `BracketExpansionFailed`: Geometric expansion found no sign change
/// - `MaxIterationsExceeded`: Iteration budget exhausted before convergence
/// - `LeastSquaresStagnated`: Damping exhausted without reducing the residual
/// - `InvalidInterval`: Degenerate or non-finite seed interval
/// - `NumericalInstability`: Non-finite values or singular systems
///
/// # Examples
/// ```
/// use pricer_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Bracket expansion did not locate a sign change.
    #[error("No sign change found in [{low}, {high}] after {iterations} expansions")]
    BracketExpansionFailed {
        /// Lower end of the last interval tried
        low: f64,
        /// Upper end of the last interval tried
        high: f64,
        /// Number of expansions performed
        iterations: usize,
    },

    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// Least-squares iteration could not reduce the residual any further.
    #[error("Least squares stagnated after {iterations} iterations (residual sum of squares {residual_ss})")]
    LeastSquaresStagnated {
        /// Number of iterations performed
        iterations: usize,
        /// Best residual sum of squares reached
        residual_ss: f64,
    },

    /// Seed interval is degenerate or not finite.
    #[error("Invalid interval: [{low}, {high}]")]
    InvalidInterval {
        /// Lower end
        low: f64,
        /// Upper end
        high: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl SolverError {
    /// Create a numerical instability error.
    pub fn numerical_instability(message: impl Into<String>) -> Self {
        Self::NumericalInstability(message.into())
    }

    /// Check if this error comes from bracketing (seed or expansion).
    pub fn is_bracketing_failure(&self) -> bool {
        matches!(
            self,
            Self::NoBracket { .. } | Self::BracketExpansionFailed { .. }
        )
    }

    /// Check if this is an iteration budget failure.
    pub fn is_max_iterations(&self) -> bool {
        matches!(self, Self::MaxIterationsExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // PricingError Tests
    // ========================================

    #[test]
    fn test_pricing_error_display() {
        let err = PricingError::invalid_input("empty fixed leg");
        assert_eq!(format!("{}", err), "Invalid input: empty fixed leg");

        let err = PricingError::model_failure("negative variance");
        assert_eq!(format!("{}", err), "Model failure: negative variance");

        let err = PricingError::UnsupportedInstrument("off-grid payment".to_string());
        assert!(format!("{}", err).starts_with("Unsupported instrument"));
    }

    #[test]
    fn test_pricing_error_from_solver_error() {
        let err: PricingError = SolverError::MaxIterationsExceeded { iterations: 7 }.into();
        match err {
            PricingError::NumericalInstability(msg) => assert!(msg.contains("7")),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    // ========================================
    // SolverError Tests
    // ========================================

    #[test]
    fn test_solver_error_display() {
        let err = SolverError::BracketExpansionFailed {
            low: -1.0,
            high: 3.5,
            iterations: 50,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("3.5"));
        assert!(msg.contains("50 expansions"));

        let err = SolverError::LeastSquaresStagnated {
            iterations: 12,
            residual_ss: 0.25,
        };
        assert!(format!("{}", err).contains("0.25"));
    }

    #[test]
    fn test_solver_error_predicates() {
        assert!(SolverError::NoBracket { a: 0.0, b: 1.0 }.is_bracketing_failure());
        assert!(SolverError::BracketExpansionFailed {
            low: 0.0,
            high: 1.0,
            iterations: 3
        }
        .is_bracketing_failure());
        assert!(!SolverError::MaxIterationsExceeded { iterations: 1 }.is_bracketing_failure());
        assert!(SolverError::MaxIterationsExceeded { iterations: 1 }.is_max_iterations());
    }

    #[test]
    fn test_solver_error_clone_eq() {
        let err = SolverError::numerical_instability("NaN residual");
        assert_eq!(err.clone(), err);
    }
}
