//! Calibration configuration.
//!
//! Settings for the three solvers driven by the engine plus the engine's own
//! switches. A configuration can be built in code, read from TOML and
//! overridden by `CALIBRATION_*` environment variables:
//!
//! ```toml
//! validate_ordering = true
//!
//! [bracket]
//! growth_factor = 1.6
//! max_expansions = 50
//!
//! [root_finder]
//! function_tolerance = 1e-8
//!
//! [least_squares]
//! max_iterations = 200
//! ```

use std::path::Path;
use std::str::FromStr;

use pricer_core::math::solvers::{BracketConfig, LMConfig, SolverConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A setting is out of range.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Setting name
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// Configuration file could not be read.
    #[error("Configuration file error: {0}")]
    FileError(String),

    /// TOML content could not be parsed.
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// An environment variable could not be parsed.
    #[error("Environment variable error: {0}")]
    EnvError(String),
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Geometric bracket expansion settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketSettings {
    /// Width multiplier per expansion
    pub growth_factor: f64,
    /// Expansion budget
    pub max_expansions: usize,
}

impl Default for BracketSettings {
    fn default() -> Self {
        Self {
            growth_factor: 1.6,
            max_expansions: 50,
        }
    }
}

/// Brent root finder settings.
///
/// `function_tolerance` is in price units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootFinderSettings {
    /// Residual tolerance
    pub function_tolerance: f64,
    /// Bracket width tolerance on the parameter
    pub variable_tolerance: f64,
    /// Iteration cap
    pub max_iterations: usize,
}

impl Default for RootFinderSettings {
    fn default() -> Self {
        Self {
            function_tolerance: 1e-8,
            variable_tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

/// Least-squares settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeastSquaresSettings {
    /// Iteration cap
    pub max_iterations: usize,
    /// Tolerance on the residual norm
    pub tolerance: f64,
    /// Initial damping
    pub initial_lambda: f64,
    /// Damping multiplier on a rejected step
    pub lambda_up: f64,
    /// Damping multiplier on an accepted step
    pub lambda_down: f64,
    /// Relative finite-difference bump
    pub fd_bump: f64,
    /// Relative improvement of the sum of squares treated as stagnation
    pub stagnation_floor: f64,
}

impl Default for LeastSquaresSettings {
    fn default() -> Self {
        let lm = LMConfig::default();
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
            initial_lambda: lm.initial_lambda,
            lambda_up: lm.lambda_up,
            lambda_down: lm.lambda_down,
            fd_bump: lm.fd_bump,
            stagnation_floor: lm.stagnation_tolerance,
        }
    }
}

/// Configuration for successive calibration.
///
/// # Examples
///
/// ```
/// use pricer_optimiser::calibration::CalibrationConfig;
///
/// let config = CalibrationConfig::default();
/// assert_eq!(config.bracket.max_expansions, 50);
/// assert!(config.validate_ordering);
///
/// let config = CalibrationConfig::builder()
///     .function_tolerance(1e-10)
///     .least_squares_max_iterations(300)
///     .build();
/// assert_eq!(config.least_squares.max_iterations, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Bracket expansion
    pub bracket: BracketSettings,
    /// Brent root finder
    pub root_finder: RootFinderSettings,
    /// Least squares
    pub least_squares: LeastSquaresSettings,
    /// Reject baskets whose nodes are not strictly increasing
    pub validate_ordering: bool,
    /// Fail a least-squares bucket that only reaches a best fit
    pub fail_on_least_squares_stagnation: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            bracket: BracketSettings::default(),
            root_finder: RootFinderSettings::default(),
            least_squares: LeastSquaresSettings::default(),
            validate_ordering: true,
            fail_on_least_squares_stagnation: false,
        }
    }
}

impl CalibrationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> CalibrationConfigBuilder {
        CalibrationConfigBuilder::new()
    }

    /// Tight tolerances and larger budgets.
    pub fn high_precision() -> Self {
        Self {
            root_finder: RootFinderSettings {
                function_tolerance: 1e-12,
                variable_tolerance: 1e-14,
                max_iterations: 300,
            },
            least_squares: LeastSquaresSettings {
                max_iterations: 500,
                tolerance: 1e-12,
                stagnation_floor: 1e-15,
                ..LeastSquaresSettings::default()
            },
            ..Self::default()
        }
    }

    /// Relaxed tolerances for speed.
    pub fn fast() -> Self {
        Self {
            bracket: BracketSettings {
                max_expansions: 30,
                ..BracketSettings::default()
            },
            root_finder: RootFinderSettings {
                function_tolerance: 1e-6,
                variable_tolerance: 1e-8,
                max_iterations: 50,
            },
            least_squares: LeastSquaresSettings {
                max_iterations: 50,
                tolerance: 1e-6,
                ..LeastSquaresSettings::default()
            },
            ..Self::default()
        }
    }

    /// Set ordering validation.
    pub fn with_validate_ordering(mut self, validate: bool) -> Self {
        self.validate_ordering = validate;
        self
    }

    /// Set whether best-fit least-squares buckets fail the run.
    pub fn with_fail_on_least_squares_stagnation(mut self, fail: bool) -> Self {
        self.fail_on_least_squares_stagnation = fail;
        self
    }

    /// Set the root finder tolerances.
    pub fn with_root_tolerances(mut self, function_tolerance: f64, variable_tolerance: f64) -> Self {
        self.root_finder.function_tolerance = function_tolerance;
        self.root_finder.variable_tolerance = variable_tolerance;
        self
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialise to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply `CALIBRATION_*` environment variables.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Recognised names:
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `CALIBRATION_BRACKET_GROWTH_FACTOR` | `bracket.growth_factor` |
    /// | `CALIBRATION_BRACKET_MAX_EXPANSIONS` | `bracket.max_expansions` |
    /// | `CALIBRATION_ROOT_FUNCTION_TOLERANCE` | `root_finder.function_tolerance` |
    /// | `CALIBRATION_ROOT_VARIABLE_TOLERANCE` | `root_finder.variable_tolerance` |
    /// | `CALIBRATION_ROOT_MAX_ITERATIONS` | `root_finder.max_iterations` |
    /// | `CALIBRATION_LS_MAX_ITERATIONS` | `least_squares.max_iterations` |
    /// | `CALIBRATION_LS_TOLERANCE` | `least_squares.tolerance` |
    /// | `CALIBRATION_VALIDATE_ORDERING` | `validate_ordering` |
    /// | `CALIBRATION_FAIL_ON_LS_STAGNATION` | `fail_on_least_squares_stagnation` |
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_value(&lookup, "CALIBRATION_BRACKET_GROWTH_FACTOR", &mut self.bracket.growth_factor)?;
        override_value(&lookup, "CALIBRATION_BRACKET_MAX_EXPANSIONS", &mut self.bracket.max_expansions)?;
        override_value(
            &lookup,
            "CALIBRATION_ROOT_FUNCTION_TOLERANCE",
            &mut self.root_finder.function_tolerance,
        )?;
        override_value(
            &lookup,
            "CALIBRATION_ROOT_VARIABLE_TOLERANCE",
            &mut self.root_finder.variable_tolerance,
        )?;
        override_value(&lookup, "CALIBRATION_ROOT_MAX_ITERATIONS", &mut self.root_finder.max_iterations)?;
        override_value(&lookup, "CALIBRATION_LS_MAX_ITERATIONS", &mut self.least_squares.max_iterations)?;
        override_value(&lookup, "CALIBRATION_LS_TOLERANCE", &mut self.least_squares.tolerance)?;
        override_value(&lookup, "CALIBRATION_VALIDATE_ORDERING", &mut self.validate_ordering)?;
        override_value(
            &lookup,
            "CALIBRATION_FAIL_ON_LS_STAGNATION",
            &mut self.fail_on_least_squares_stagnation,
        )?;
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        BracketConfig::new(self.bracket.growth_factor, self.bracket.max_expansions)
            .validate()
            .map_err(|m| ConfigError::invalid("bracket", m))?;
        self.solver_config()
            .validate()
            .map_err(|m| ConfigError::invalid("root_finder", m))?;
        self.lm_config()
            .validate()
            .map_err(|m| ConfigError::invalid("least_squares", m))?;
        Ok(())
    }

    /// Bracketer settings with optional domain bounds.
    pub fn bracket_config(&self, lower: Option<f64>, upper: Option<f64>) -> BracketConfig<f64> {
        let mut config = BracketConfig::new(self.bracket.growth_factor, self.bracket.max_expansions);
        if let Some(lower) = lower.filter(|b| b.is_finite()) {
            config = config.with_lower_bound(lower);
        }
        if let Some(upper) = upper.filter(|b| b.is_finite()) {
            config = config.with_upper_bound(upper);
        }
        config
    }

    /// Brent settings.
    pub fn solver_config(&self) -> SolverConfig<f64> {
        SolverConfig::new(
            self.root_finder.function_tolerance,
            self.root_finder.variable_tolerance,
            self.root_finder.max_iterations,
        )
    }

    /// Least-squares settings.
    pub fn lm_config(&self) -> LMConfig {
        let ls = &self.least_squares;
        LMConfig {
            tolerance: ls.tolerance,
            max_iterations: ls.max_iterations,
            initial_lambda: ls.initial_lambda,
            lambda_up: ls.lambda_up,
            lambda_down: ls.lambda_down,
            fd_bump: ls.fd_bump,
            stagnation_tolerance: ls.stagnation_floor,
            ..LMConfig::default()
        }
    }
}

fn override_value<F, T>(lookup: &F, name: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvError(format!("{}={} cannot be parsed", name, raw)))?;
    }
    Ok(())
}

/// Builder for [`CalibrationConfig`].
#[derive(Debug, Clone, Default)]
pub struct CalibrationConfigBuilder {
    config: CalibrationConfig,
}

impl CalibrationConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bracket growth factor.
    pub fn growth_factor(mut self, growth_factor: f64) -> Self {
        self.config.bracket.growth_factor = growth_factor;
        self
    }

    /// Set the bracket expansion budget.
    pub fn max_expansions(mut self, max_expansions: usize) -> Self {
        self.config.bracket.max_expansions = max_expansions;
        self
    }

    /// Set the root finder residual tolerance.
    pub fn function_tolerance(mut self, tolerance: f64) -> Self {
        self.config.root_finder.function_tolerance = tolerance;
        self
    }

    /// Set the root finder parameter tolerance.
    pub fn variable_tolerance(mut self, tolerance: f64) -> Self {
        self.config.root_finder.variable_tolerance = tolerance;
        self
    }

    /// Set the root finder iteration cap.
    pub fn root_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.root_finder.max_iterations = max_iterations;
        self
    }

    /// Set the least-squares iteration cap.
    pub fn least_squares_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.least_squares.max_iterations = max_iterations;
        self
    }

    /// Set the least-squares residual tolerance.
    pub fn least_squares_tolerance(mut self, tolerance: f64) -> Self {
        self.config.least_squares.tolerance = tolerance;
        self
    }

    /// Set the finite-difference bump.
    pub fn fd_bump(mut self, bump: f64) -> Self {
        self.config.least_squares.fd_bump = bump;
        self
    }

    /// Set ordering validation.
    pub fn validate_ordering(mut self, validate: bool) -> Self {
        self.config.validate_ordering = validate;
        self
    }

    /// Set whether best-fit least-squares buckets fail the run.
    pub fn fail_on_least_squares_stagnation(mut self, fail: bool) -> Self {
        self.config.fail_on_least_squares_stagnation = fail;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CalibrationConfig {
        self.config
    }
}
