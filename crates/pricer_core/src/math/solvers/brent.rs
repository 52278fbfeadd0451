//! Brent's method root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;
use num_traits::Float;

/// Outcome of a successful bracketing root search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolution<T: Float> {
    /// Abscissa of the root
    pub root: T,
    /// Function value at `root`
    pub residual: T,
    /// Function evaluations after the two endpoint evaluations
    pub iterations: usize,
}

/// Brent's method root finder.
///
/// Combines bisection, secant, and inverse quadratic interpolation for
/// robust root finding without requiring derivatives. Guaranteed to
/// converge for continuous functions with a valid bracket.
///
/// # Convergence
///
/// Iteration stops on whichever comes first:
/// - `|f(b)| < config.tolerance` (function units, e.g. present value)
/// - bracket half-width `<= 2 * eps * |b| + variable_tolerance / 2` (abscissa units)
///
/// # Type Parameters
///
/// * `T` - Floating-point type (e.g., `f64`)
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
///
/// // Solve x³ - x - 2 = 0 in bracket [1, 2]
/// let f = |x: f64| x * x * x - x - 2.0;
///
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!((f(root)).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct BrentSolver<T: Float> {
    config: SolverConfig<T>,
}

impl<T: Float> BrentSolver<T> {
    /// Create a new Brent solver with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Solver configuration with tolerances and max iterations
    pub fn new(config: SolverConfig<T>) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    /// Returns a reference to the solver configuration.
    pub fn config(&self) -> &SolverConfig<T> {
        &self.config
    }

    /// Find a root of `f` in the bracket [a, b].
    ///
    /// Requires that `f(a)` and `f(b)` have opposite signs (a valid bracket).
    ///
    /// # Arguments
    ///
    /// * `f` - Function to find root of
    /// * `a` - Left bracket endpoint
    /// * `b` - Right bracket endpoint
    ///
    /// # Returns
    ///
    /// * `Ok(x)` - Root satisfying one of the convergence criteria
    /// * `Err(SolverError::NoBracket)` - `f(a)` and `f(b)` have same sign
    /// * `Err(SolverError::MaxIterationsExceeded)` - Failed to converge
    ///
    /// # Example
    ///
    /// ```
    /// use pricer_core::math::solvers::{BrentSolver, SolverConfig};
    ///
    /// let solver = BrentSolver::new(SolverConfig::default());
    ///
    /// // Solve x² - 2 = 0 in bracket [0, 2]
    /// let f = |x: f64| x * x - 2.0;
    ///
    /// let root = solver.find_root(f, 0.0, 2.0).unwrap();
    /// assert!((root - std::f64::consts::SQRT_2).abs() < 1e-9);
    /// ```
    pub fn find_root<F>(&self, f: F, a: T, b: T) -> Result<T, SolverError>
    where
        F: Fn(T) -> T,
    {
        self.try_solve(|x| Ok::<T, SolverError>(f(x)), a, b)
            .map(|solution| solution.root)
    }

    /// Find a root of a fallible function in the bracket [a, b].
    ///
    /// Errors from `f` abort the search and are returned as-is; solver
    /// failures are converted into `E`.
    pub fn try_solve<F, E>(&self, mut f: F, a: T, b: T) -> Result<RootSolution<T>, E>
    where
        F: FnMut(T) -> Result<T, E>,
        E: From<SolverError>,
    {
        let two = T::one() + T::one();
        let three = two + T::one();
        let half = T::one() / two;

        let mut a = a;
        let mut b = b;
        let mut fa = checked(a, f(a)?)?;
        let mut fb = checked(b, f(b)?)?;

        if (fa > T::zero() && fb > T::zero()) || (fa < T::zero() && fb < T::zero()) {
            return Err(SolverError::NoBracket {
                a: to_f64(a),
                b: to_f64(b),
            }
            .into());
        }

        // Endpoints may already be roots; prefer the smaller residual
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }

        let mut c = b;
        let mut fc = fb;
        let mut d = T::zero();
        let mut e = T::zero();

        for iteration in 0..=self.config.max_iterations {
            // Keep the root between b and c
            if (fb > T::zero() && fc > T::zero()) || (fb < T::zero() && fc < T::zero()) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            // b is always the best estimate
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol1 = two * T::epsilon() * b.abs() + half * self.config.variable_tolerance;
            let xm = half * (c - b);

            if fb.abs() < self.config.tolerance || xm.abs() <= tol1 || fb == T::zero() {
                return Ok(RootSolution {
                    root: b,
                    residual: fb,
                    iterations: iteration,
                });
            }
            if iteration == self.config.max_iterations {
                break;
            }

            if e.abs() >= tol1 && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q);
                if a == c {
                    // Secant step
                    p = two * xm * s;
                    q = T::one() - s;
                } else {
                    // Inverse quadratic interpolation
                    let qq = fa / fc;
                    let r = fb / fc;
                    p = s * (two * xm * qq * (qq - r) - (b - a) * (r - T::one()));
                    q = (qq - T::one()) * (r - T::one()) * (s - T::one());
                }
                if p > T::zero() {
                    q = -q;
                }
                p = p.abs();
                let min1 = three * xm * q - (tol1 * q).abs();
                let min2 = (e * q).abs();
                if two * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }

            a = b;
            fa = fb;
            if d.abs() > tol1 {
                b = b + d;
            } else if xm > T::zero() {
                b = b + tol1;
            } else {
                b = b - tol1;
            }
            fb = checked(b, f(b)?)?;
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        }
        .into())
    }
}

#[inline]
fn to_f64<T: Float>(x: T) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

fn checked<T: Float>(x: T, fx: T) -> Result<T, SolverError> {
    if fx.is_nan() {
        Err(SolverError::NumericalInstability(format!(
            "NaN function value at x = {}",
            to_f64(x)
        )))
    } else {
        Ok(fx)
    }
}
