//! Solver configuration types.

use num_traits::Float;

/// Configuration for the Brent root finder.
///
/// Two tolerances are carried because calibration residuals are present-value
/// differences while the unknown is a model parameter:
///
/// - `tolerance`: stop when `|f(x)| < tolerance` (price units)
/// - `variable_tolerance`: stop when the bracket half-width falls below it (parameter units)
///
/// # Type Parameters
///
/// * `T` - Floating-point type for tolerance (e.g., `f64`)
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::SolverConfig;
///
/// // Use default configuration
/// let config: SolverConfig<f64> = SolverConfig::default();
/// assert!(config.tolerance < 1e-6);
/// assert_eq!(config.max_iterations, 100);
///
/// // Custom configuration
/// let custom = SolverConfig {
///     tolerance: 1e-2,
///     variable_tolerance: 1e-10,
///     max_iterations: 200,
/// };
/// assert!(custom.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig<T: Float> {
    /// Convergence tolerance on the function value.
    ///
    /// The solver stops when `|f(x)| < tolerance`.
    pub tolerance: T,

    /// Convergence tolerance on the root location.
    ///
    /// The solver stops when the bracket half-width is below this value.
    pub variable_tolerance: T,

    /// Maximum number of iterations before giving up.
    ///
    /// If the solver doesn't converge within this limit,
    /// it returns `SolverError::MaxIterationsExceeded`.
    pub max_iterations: usize,
}

impl<T: Float> Default for SolverConfig<T> {
    /// Default values:
    /// - `tolerance`: 1e-8
    /// - `variable_tolerance`: 1e-12
    /// - `max_iterations`: 100
    fn default() -> Self {
        Self {
            tolerance: T::from(1e-8).unwrap_or_else(T::epsilon),
            variable_tolerance: T::from(1e-12).unwrap_or_else(T::epsilon),
            max_iterations: 100,
        }
    }
}

impl<T: Float> SolverConfig<T> {
    /// Create a new configuration with specified values.
    ///
    /// # Example
    ///
    /// ```
    /// use pricer_core::math::solvers::SolverConfig;
    ///
    /// let config = SolverConfig::new(1e-2, 1e-10, 200);
    /// assert_eq!(config.max_iterations, 200);
    /// ```
    pub fn new(tolerance: T, variable_tolerance: T, max_iterations: usize) -> Self {
        Self {
            tolerance,
            variable_tolerance,
            max_iterations,
        }
    }

    /// Create a configuration with high precision settings.
    ///
    /// Uses tighter tolerances (1e-12 / 1e-15) and more iterations (500).
    pub fn high_precision() -> Self {
        Self {
            tolerance: T::from(1e-12).unwrap_or_else(T::epsilon),
            variable_tolerance: T::from(1e-15).unwrap_or_else(T::epsilon),
            max_iterations: 500,
        }
    }

    /// Create a configuration optimised for fast convergence.
    ///
    /// Uses relaxed tolerances (1e-6 / 1e-8) and fewer iterations (50).
    pub fn fast() -> Self {
        Self {
            tolerance: T::from(1e-6).unwrap_or_else(T::epsilon),
            variable_tolerance: T::from(1e-8).unwrap_or_else(T::epsilon),
            max_iterations: 50,
        }
    }

    /// Check the configuration for non-positive values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tolerance >= T::zero()) {
            return Err("tolerance must be non-negative".to_string());
        }
        if !(self.variable_tolerance > T::zero()) {
            return Err("variable_tolerance must be positive".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be > 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for geometric root bracketing.
///
/// # Fields
///
/// * `growth_factor` - Multiplier applied to the interval width on each expansion
/// * `max_expansions` - Expansion budget before reporting failure
/// * `lower_bound` / `upper_bound` - Optional domain limits the expansion never crosses
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::BracketConfig;
///
/// let config = BracketConfig::<f64>::default().with_lower_bound(0.0);
/// assert_eq!(config.max_expansions, 50);
/// assert_eq!(config.lower_bound, Some(0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketConfig<T: Float> {
    /// Expansion multiplier applied to the interval width.
    pub growth_factor: T,
    /// Maximum number of expansions.
    pub max_expansions: usize,
    /// Lowest admissible abscissa.
    pub lower_bound: Option<T>,
    /// Highest admissible abscissa.
    pub upper_bound: Option<T>,
}

impl<T: Float> Default for BracketConfig<T> {
    /// Default values: growth factor 1.6, 50 expansions, unbounded.
    fn default() -> Self {
        Self {
            growth_factor: T::from(1.6).unwrap_or_else(T::one),
            max_expansions: 50,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

impl<T: Float> BracketConfig<T> {
    /// Create a new bracketing configuration without domain bounds.
    pub fn new(growth_factor: T, max_expansions: usize) -> Self {
        Self {
            growth_factor,
            max_expansions,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Restrict expansion to `x >= lower`.
    pub fn with_lower_bound(mut self, lower: T) -> Self {
        self.lower_bound = Some(lower);
        self
    }

    /// Restrict expansion to `x <= upper`.
    pub fn with_upper_bound(mut self, upper: T) -> Self {
        self.upper_bound = Some(upper);
        self
    }

    /// Check the configuration for invalid values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.growth_factor > T::zero()) {
            return Err("growth_factor must be positive".to_string());
        }
        if self.max_expansions == 0 {
            return Err("max_expansions must be > 0".to_string());
        }
        if let (Some(lo), Some(hi)) = (self.lower_bound, self.upper_bound) {
            if !(lo < hi) {
                return Err("lower_bound must be below upper_bound".to_string());
            }
        }
        Ok(())
    }
}
