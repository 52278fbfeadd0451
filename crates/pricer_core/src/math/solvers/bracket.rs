//! Geometric root bracketing.

use super::BracketConfig;
use crate::types::SolverError;
use num_traits::Float;

/// An interval whose endpoint function values have opposite signs (or touch zero).
///
/// Lives for a single bracketing call; the pair is handed straight to a
/// bracketing root finder such as [`BrentSolver`](super::BrentSolver).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootBracket<T: Float> {
    /// Lower endpoint
    pub low: T,
    /// Upper endpoint
    pub high: T,
    /// Function value at `low`
    pub f_low: T,
    /// Function value at `high`
    pub f_high: T,
    /// Number of expansions performed (0 if the seed already bracketed)
    pub expansions: usize,
}

impl<T: Float> RootBracket<T> {
    /// Width of the bracket.
    #[inline]
    pub fn width(&self) -> T {
        self.high - self.low
    }

    /// Returns true if `x` lies inside the bracket.
    #[inline]
    pub fn contains(&self, x: T) -> bool {
        x >= self.low && x <= self.high
    }
}

/// Root bracketer by outward geometric expansion.
///
/// Starting from a seed interval `[x1, x2]`, the endpoint with the smaller
/// absolute function value is pushed outward by `growth_factor` times the
/// current width until the function changes sign:
///
/// ```text
/// |f(x1)| < |f(x2)|  =>  x1 <- x1 + g (x1 - x2)
/// otherwise          =>  x2 <- x2 + g (x2 - x1)
/// ```
///
/// Optional domain bounds (e.g. non-negative volatilities) are honoured by
/// clamping; once an endpoint is pinned at its bound only the opposite side
/// keeps expanding.
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::{BracketConfig, RootBracketer};
///
/// let bracketer = RootBracketer::new(BracketConfig::default());
///
/// // Root at x = 10, seed far to the left
/// let bracket = bracketer.bracket(|x: f64| x - 10.0, 0.0, 1.0).unwrap();
/// assert!(bracket.contains(10.0));
/// assert!(bracket.expansions > 0);
/// ```
#[derive(Debug, Clone)]
pub struct RootBracketer<T: Float> {
    config: BracketConfig<T>,
}

impl<T: Float> RootBracketer<T> {
    /// Create a new bracketer with the given configuration.
    pub fn new(config: BracketConfig<T>) -> Self {
        Self { config }
    }

    /// Create a bracketer with default configuration (factor 1.6, 50 expansions).
    pub fn with_defaults() -> Self {
        Self::new(BracketConfig::default())
    }

    /// Returns a reference to the bracketing configuration.
    pub fn config(&self) -> &BracketConfig<T> {
        &self.config
    }

    /// Bracket a root of an infallible function.
    ///
    /// # Arguments
    ///
    /// * `f` - Function whose sign change is searched
    /// * `low_guess` - First seed endpoint
    /// * `high_guess` - Second seed endpoint (order does not matter)
    ///
    /// # Returns
    ///
    /// * `Ok(bracket)` - With `f_low * f_high <= 0`
    /// * `Err(SolverError::BracketExpansionFailed)` - Budget exhausted
    /// * `Err(SolverError::InvalidInterval)` - Degenerate seed
    pub fn bracket<F>(&self, f: F, low_guess: T, high_guess: T) -> Result<RootBracket<T>, SolverError>
    where
        F: Fn(T) -> T,
    {
        self.try_bracket(|x| Ok::<T, SolverError>(f(x)), low_guess, high_guess)
    }

    /// Bracket a root of a fallible function.
    ///
    /// Errors raised by `f` are returned untouched; solver failures are
    /// converted into the caller's error type.
    pub fn try_bracket<F, E>(&self, mut f: F, low_guess: T, high_guess: T) -> Result<RootBracket<T>, E>
    where
        F: FnMut(T) -> Result<T, E>,
        E: From<SolverError>,
    {
        let (lo, hi) = if low_guess <= high_guess {
            (low_guess, high_guess)
        } else {
            (high_guess, low_guess)
        };
        let mut x1 = self.clamp(lo);
        let mut x2 = self.clamp(hi);

        if !x1.is_finite() || !x2.is_finite() || x1 >= x2 {
            return Err(SolverError::InvalidInterval {
                low: to_f64(x1),
                high: to_f64(x2),
            }
            .into());
        }

        let mut f1 = finite(x1, f(x1)?)?;
        let mut f2 = finite(x2, f(x2)?)?;

        if straddles(f1, f2) {
            return Ok(self.make_bracket(x1, x2, f1, f2, 0));
        }

        let g = self.config.growth_factor;
        let mut performed = 0;

        for expansion in 1..=self.config.max_expansions {
            let lower_pinned = self.config.lower_bound.map_or(false, |lb| x1 <= lb);
            let upper_pinned = self.config.upper_bound.map_or(false, |ub| x2 >= ub);
            if lower_pinned && upper_pinned {
                break;
            }

            let expand_lower = upper_pinned || (!lower_pinned && f1.abs() < f2.abs());
            if expand_lower {
                x1 = self.clamp(x1 + g * (x1 - x2));
                f1 = finite(x1, f(x1)?)?;
            } else {
                x2 = self.clamp(x2 + g * (x2 - x1));
                f2 = finite(x2, f(x2)?)?;
            }
            performed = expansion;

            if straddles(f1, f2) {
                return Ok(self.make_bracket(x1, x2, f1, f2, expansion));
            }
        }

        Err(SolverError::BracketExpansionFailed {
            low: to_f64(x1),
            high: to_f64(x2),
            iterations: performed,
        }
        .into())
    }

    fn clamp(&self, x: T) -> T {
        let mut x = x;
        if let Some(lb) = self.config.lower_bound {
            x = x.max(lb);
        }
        if let Some(ub) = self.config.upper_bound {
            x = x.min(ub);
        }
        x
    }

    fn make_bracket(&self, low: T, high: T, f_low: T, f_high: T, expansions: usize) -> RootBracket<T> {
        RootBracket {
            low,
            high,
            f_low,
            f_high,
            expansions,
        }
    }
}

#[inline]
fn straddles<T: Float>(a: T, b: T) -> bool {
    (a <= T::zero() && b >= T::zero()) || (a >= T::zero() && b <= T::zero())
}

#[inline]
fn to_f64<T: Float>(x: T) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

fn finite<T: Float>(x: T, fx: T) -> Result<T, SolverError> {
    if fx.is_finite() {
        Ok(fx)
    } else {
        Err(SolverError::NumericalInstability(format!(
            "non-finite function value at x = {}",
            to_f64(x)
        )))
    }
}
