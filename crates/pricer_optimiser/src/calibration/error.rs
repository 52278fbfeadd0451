//! Calibration-specific error types.
//!
//! Numerical failures reported by the solvers are mapped onto this taxonomy
//! with the index of the failing bucket attached, so that a caller can tell
//! which part of the term structure could not be fitted.

use pricer_core::types::{PricingError, SolverError};
use thiserror::Error;

use super::config::ConfigError;

/// Errors that can occur during successive calibration.
///
/// # Variants
///
/// - `NoBracketFound`: Bracket expansion found no sign change of the residual
/// - `RootFindingDidNotConverge`: Brent iteration exhausted its budget
/// - `LeastSquaresDidNotConverge`: Least-squares fit stopped short of the target
/// - `InvalidBucketOrdering`: Buckets not in increasing node order
/// - `EmptyBasket`: Nothing to calibrate
/// - `InvalidParameter`: Objective or basket set up inconsistently
/// - `BucketNotOpen` / `AlreadyCalibrated`: Lifecycle misuse
/// - `Solver`: Any other solver failure, with the bucket attached
/// - `Pricing`: Wrapped pricer or target provider error
/// - `Config`: Wrapped configuration error
///
/// # Examples
///
/// ```
/// use pricer_optimiser::calibration::CalibrationError;
///
/// let err = CalibrationError::no_bracket_found(3, 0.0, 0.5, 50);
/// assert!(err.is_numerical_failure());
/// assert_eq!(err.bucket(), Some(3));
/// assert!(format!("{}", err).contains("bucket 3"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The residual never changed sign while expanding the seed interval.
    #[error(
        "No bracket found for bucket {bucket}: residual keeps its sign on [{low}, {high}] after {iterations} expansions"
    )]
    NoBracketFound {
        /// Failing bucket
        bucket: usize,
        /// Lower end of the last interval tried
        low: f64,
        /// Upper end of the last interval tried
        high: f64,
        /// Expansions performed
        iterations: usize,
    },

    /// Brent iteration exceeded its cap.
    #[error(
        "Root finding did not converge for bucket {bucket}: residual = {residual} after {iterations} iterations"
    )]
    RootFindingDidNotConverge {
        /// Failing bucket
        bucket: usize,
        /// Iterations attempted
        iterations: usize,
        /// Last residual evaluated
        residual: f64,
    },

    /// Least-squares iteration exceeded its cap or stagnated.
    #[error(
        "Least squares did not converge for bucket {bucket}: residual sum of squares = {residual_ss} after {iterations} iterations"
    )]
    LeastSquaresDidNotConverge {
        /// Failing bucket
        bucket: usize,
        /// Iterations performed
        iterations: usize,
        /// Best residual sum of squares reached
        residual_ss: f64,
    },

    /// Bucket nodes are not strictly increasing.
    #[error(
        "Invalid bucket ordering at bucket {bucket}: {current} does not come after {previous}"
    )]
    InvalidBucketOrdering {
        /// Offending bucket
        bucket: usize,
        /// Node (or boundary) of the previous bucket
        previous: f64,
        /// Node (or boundary) of the offending bucket
        current: f64,
    },

    /// No bucket was registered.
    #[error("Empty basket: no calibration bucket registered")]
    EmptyBasket,

    /// Inconsistent objective or basket setup.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Live-parameter operation without an open bucket.
    #[error("No bucket is open for calibration")]
    BucketNotOpen,

    /// The engine has already run.
    #[error("Calibration has already run")]
    AlreadyCalibrated,

    /// Solver failure outside the dedicated variants.
    #[error("Solver error in bucket {bucket}: {source}")]
    Solver {
        /// Failing bucket
        bucket: usize,
        /// Underlying solver error
        #[source]
        source: SolverError,
    },

    /// Pricer or target provider failure.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Configuration failure.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CalibrationError {
    /// Create a no-bracket error.
    pub fn no_bracket_found(bucket: usize, low: f64, high: f64, iterations: usize) -> Self {
        Self::NoBracketFound {
            bucket,
            low,
            high,
            iterations,
        }
    }

    /// Create a root-finding convergence error.
    pub fn root_finding_did_not_converge(bucket: usize, iterations: usize, residual: f64) -> Self {
        Self::RootFindingDidNotConverge {
            bucket,
            iterations,
            residual,
        }
    }

    /// Create a least-squares convergence error.
    pub fn least_squares_did_not_converge(
        bucket: usize,
        iterations: usize,
        residual_ss: f64,
    ) -> Self {
        Self::LeastSquaresDidNotConverge {
            bucket,
            iterations,
            residual_ss,
        }
    }

    /// Create an ordering error.
    pub fn invalid_bucket_ordering(bucket: usize, previous: f64, current: f64) -> Self {
        Self::InvalidBucketOrdering {
            bucket,
            previous,
            current,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Map a solver failure raised while solving `bucket`.
    ///
    /// `last_residual` is the last residual evaluated by the objective and
    /// is reported when the iteration budget runs out.
    pub fn from_solver(bucket: usize, error: SolverError, last_residual: f64) -> Self {
        match error {
            SolverError::BracketExpansionFailed {
                low,
                high,
                iterations,
            } => Self::no_bracket_found(bucket, low, high, iterations),
            SolverError::NoBracket { a, b } => Self::no_bracket_found(bucket, a, b, 0),
            SolverError::MaxIterationsExceeded { iterations } => {
                Self::root_finding_did_not_converge(bucket, iterations, last_residual)
            }
            SolverError::LeastSquaresStagnated {
                iterations,
                residual_ss,
            } => Self::least_squares_did_not_converge(bucket, iterations, residual_ss),
            source => Self::Solver { bucket, source },
        }
    }

    /// Index of the bucket the error refers to, if any.
    pub fn bucket(&self) -> Option<usize> {
        match self {
            Self::NoBracketFound { bucket, .. }
            | Self::RootFindingDidNotConverge { bucket, .. }
            | Self::LeastSquaresDidNotConverge { bucket, .. }
            | Self::InvalidBucketOrdering { bucket, .. }
            | Self::Solver { bucket, .. } => Some(*bucket),
            _ => None,
        }
    }

    /// Check if this is a bracketing failure.
    pub fn is_no_bracket(&self) -> bool {
        matches!(self, Self::NoBracketFound { .. })
    }

    /// Check if this is an ordering failure.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::InvalidBucketOrdering { .. })
    }

    /// Check if this is one of the three numerical failure kinds.
    pub fn is_numerical_failure(&self) -> bool {
        matches!(
            self,
            Self::NoBracketFound { .. }
                | Self::RootFindingDidNotConverge { .. }
                | Self::LeastSquaresDidNotConverge { .. }
        )
    }
}

/// A failed calibration run.
///
/// Buckets committed before the failure stay in `committed`; the failing
/// bucket's trial values are rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFailure<P> {
    /// Why the run stopped
    pub error: CalibrationError,
    /// Failing bucket, `None` when the run stopped before the first solve
    pub bucket: Option<usize>,
    /// Number of buckets committed before the failure
    pub committed_buckets: usize,
    /// Parameters holding the committed prefix
    pub committed: P,
}

impl<P> CalibrationFailure<P> {
    /// Error without the partial parameters.
    pub fn into_error(self) -> CalibrationError {
        self.error
    }
}

impl<P: std::fmt::Debug> std::fmt::Display for CalibrationFailure<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "calibration failed after {} committed buckets: {}",
            self.committed_buckets, self.error
        )
    }
}

impl<P: std::fmt::Debug> std::error::Error for CalibrationFailure<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
