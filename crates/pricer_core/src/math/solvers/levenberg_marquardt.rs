//! Levenberg-Marquardt nonlinear least-squares solver.
//!
//! This module provides the [`LevenbergMarquardtSolver`] for the small dense
//! least-squares problems that appear when a bucket of calibration
//! instruments is fitted to several model parameters at once.
//!
//! # Algorithm
//!
//! Damped Gauss-Newton with Marquardt diagonal scaling:
//!
//! ```text
//! (J^T J + λ diag(J^T J)) δ = -J^T r
//! p_{n+1} = Π(p_n + δ)
//! ```
//!
//! where:
//! - `J` is the forward-difference Jacobian of the residuals
//! - `r` is the residual vector
//! - `λ` is the damping factor (reduced on accepted steps, raised on rejected ones)
//! - `Π` projects onto the optional box [`ParameterBounds`]
//!
//! Only steps that strictly reduce the residual sum of squares are accepted,
//! so the returned parameters are never worse than the initial guess.
//!
//! # Example
//!
//! ```
//! use pricer_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//!
//! // Fit y = a * exp(-b * x) to data
//! let x_data = vec![0.0, 1.0, 2.0, 3.0, 4.0];
//! let y_data: Vec<f64> = x_data.iter().map(|x: &f64| 2.0 * (-0.5 * x).exp()).collect();
//!
//! let solver = LevenbergMarquardtSolver::new(LMConfig::default());
//!
//! let residuals = |params: &[f64]| -> Vec<f64> {
//!     x_data.iter().zip(&y_data).map(|(&x, &y)| {
//!         params[0] * (-params[1] * x).exp() - y
//!     }).collect()
//! };
//!
//! let result = solver.solve(residuals, vec![1.0, 1.0]).unwrap();
//! assert!(result.converged);
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! ```

use crate::types::SolverError;

/// Configuration for Levenberg-Marquardt solver.
///
/// # Fields
///
/// * `tolerance` - Absolute tolerance on the residual norm `sqrt(Σ r²)`
/// * `max_iterations` - Maximum number of iterations
/// * `initial_lambda` - Initial damping factor
/// * `lambda_up` - Factor to increase lambda when step is rejected
/// * `lambda_down` - Factor to decrease lambda when step is accepted
/// * `min_lambda` - Minimum value for lambda
/// * `max_lambda` - Damping ceiling; exceeding it ends the search
/// * `param_tolerance` - Relative step size below which the search stops
/// * `stagnation_tolerance` - Relative reduction of the sum of squares below which an accepted step ends the search
/// * `fd_bump` - Relative bump for the forward-difference Jacobian
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LMConfig {
    /// Convergence tolerance for the residual norm.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor.
    pub max_lambda: f64,
    /// Tolerance for parameter change convergence.
    pub param_tolerance: f64,
    /// Relative sum-of-squares improvement treated as stagnation.
    pub stagnation_tolerance: f64,
    /// Relative finite-difference bump.
    pub fd_bump: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            param_tolerance: 1e-10,
            stagnation_tolerance: 1e-12,
            fd_bump: 1e-7,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Create a fast configuration with relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
            param_tolerance: 1e-8,
            ..Default::default()
        }
    }

    /// Create a high precision configuration.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 500,
            param_tolerance: 1e-14,
            stagnation_tolerance: 1e-15,
            ..Default::default()
        }
    }

    /// Check the configuration for inconsistent values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be > 0".to_string());
        }
        if !(self.tolerance >= 0.0) || !(self.param_tolerance >= 0.0) {
            return Err("tolerances must be non-negative".to_string());
        }
        if !(self.lambda_up > 1.0) || !(self.lambda_down > 0.0 && self.lambda_down < 1.0) {
            return Err("lambda_up must exceed 1 and lambda_down must lie in (0, 1)".to_string());
        }
        if !(self.min_lambda > 0.0 && self.min_lambda <= self.initial_lambda)
            || !(self.initial_lambda <= self.max_lambda)
        {
            return Err("require 0 < min_lambda <= initial_lambda <= max_lambda".to_string());
        }
        if !(self.fd_bump > 0.0) {
            return Err("fd_bump must be positive".to_string());
        }
        Ok(())
    }
}

/// Why a least-squares run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LMTermination {
    /// Residual norm fell below `tolerance`.
    ResidualTolerance,
    /// Relative step fell below `param_tolerance`.
    ParameterTolerance,
    /// Accepted step improved the sum of squares by less than `stagnation_tolerance`.
    Stagnation,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Damping rose past `max_lambda` without finding a downhill step.
    DampingExhausted,
}

impl LMTermination {
    /// Returns true if the stop reason counts as convergence.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            Self::ResidualTolerance | Self::ParameterTolerance | Self::Stagnation
        )
    }
}

/// Result of Levenberg-Marquardt optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final optimized parameters.
    pub params: Vec<f64>,
    /// Final residual sum of squares.
    pub residual_ss: f64,
    /// Residual sum of squares at the (projected) initial guess.
    pub initial_residual_ss: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether convergence was achieved.
    pub converged: bool,
    /// Stop reason.
    pub termination: LMTermination,
    /// Final lambda value.
    pub final_lambda: f64,
}

impl LMResult {
    /// Get the root mean square error.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.residual_ss / n_observations as f64).sqrt()
    }
}

/// Box constraints `lower[i] <= p[i] <= upper[i]`.
///
/// Infinite limits are allowed for unbounded coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ParameterBounds {
    /// Create bounds from per-coordinate limits.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidInterval` if lengths differ or any lower limit
    /// is not below its upper limit.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, SolverError> {
        if lower.len() != upper.len() {
            return Err(SolverError::numerical_instability(format!(
                "bounds length mismatch: {} lower vs {} upper",
                lower.len(),
                upper.len()
            )));
        }
        for (&lo, &hi) in lower.iter().zip(&upper) {
            if !(lo < hi) {
                return Err(SolverError::InvalidInterval { low: lo, high: hi });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Unbounded box of dimension `n`.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Returns true for a zero-dimensional box.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower limits.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper limits.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Clamp `params` into the box in place.
    pub fn project(&self, params: &mut [f64]) {
        for ((p, &lo), &hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.max(lo).min(hi);
        }
    }

    /// Returns true if every coordinate lies inside the box.
    pub fn contains(&self, params: &[f64]) -> bool {
        params
            .iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .all(|((&p, &lo), &hi)| p >= lo && p <= hi)
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// Solves optimization problems of the form:
/// ```text
/// min_{p in box} ||f(p)||^2
/// ```
///
/// where `f(p)` is a vector-valued function (residuals) and `p` is a parameter vector.
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
///
/// let solver = LevenbergMarquardtSolver::new(LMConfig::default());
///
/// // Simple quadratic: minimize (p[0] - 2)^2 + (p[1] - 3)^2
/// let residuals = |params: &[f64]| -> Vec<f64> {
///     vec![params[0] - 2.0, params[1] - 3.0]
/// };
///
/// let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();
/// assert!(result.converged);
/// assert!((result.params[0] - 2.0).abs() < 1e-6);
/// assert!((result.params[1] - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LMConfig::default())
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Solve an unconstrained problem with an infallible residual function.
    ///
    /// # Arguments
    ///
    /// * `residuals` - Function that computes residuals given parameters
    /// * `initial_params` - Initial parameter guess
    ///
    /// # Returns
    ///
    /// * `Ok(LMResult)` - Best parameters found; check `converged`
    /// * `Err(SolverError)` - Empty problem or non-finite initial residuals
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        self.try_solve(
            |p: &[f64]| Ok::<Vec<f64>, SolverError>(residuals(p)),
            initial_params,
            None,
        )
    }

    /// Solve a box-constrained problem with a fallible residual function.
    ///
    /// Errors returned by `residuals` abort the search immediately. A trial
    /// point producing non-finite residuals is treated as a rejected step.
    ///
    /// # Arguments
    ///
    /// * `residuals` - Residual function
    /// * `initial_params` - Initial guess, projected onto `bounds` first
    /// * `bounds` - Optional box; its dimension must match `initial_params`
    pub fn try_solve<F, E>(
        &self,
        mut residuals: F,
        initial_params: Vec<f64>,
        bounds: Option<&ParameterBounds>,
    ) -> Result<LMResult, E>
    where
        F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
        E: From<SolverError>,
    {
        let n_params = initial_params.len();
        if n_params == 0 {
            return Err(SolverError::numerical_instability("Empty parameter vector").into());
        }
        if let Some(b) = bounds {
            if b.len() != n_params {
                return Err(SolverError::numerical_instability(format!(
                    "bounds dimension {} does not match {} parameters",
                    b.len(),
                    n_params
                ))
                .into());
            }
        }

        let mut params = initial_params;
        if let Some(b) = bounds {
            b.project(&mut params);
        }

        let mut r = residuals(&params)?;
        if r.is_empty() {
            return Err(SolverError::numerical_instability("Empty residual vector").into());
        }
        let mut ss = sum_of_squares(&r);
        if !ss.is_finite() {
            return Err(
                SolverError::numerical_instability("Non-finite residuals at initial guess").into(),
            );
        }

        let initial_ss = ss;
        let mut lambda = self.config.initial_lambda;
        let mut jacobian: Option<Vec<Vec<f64>>> = None;
        let mut iterations = 0;
        let mut termination = LMTermination::MaxIterations;

        while iterations < self.config.max_iterations {
            if ss.sqrt() < self.config.tolerance {
                termination = LMTermination::ResidualTolerance;
                break;
            }
            iterations += 1;

            // Jacobian only changes after an accepted step
            let jac = match jacobian.take() {
                Some(j) => j,
                None => compute_jacobian(&mut residuals, &params, &r, bounds, self.config.fd_bump)?,
            };

            let delta = solve_normal_equations(&jac, &r, lambda);
            jacobian = Some(jac);
            let delta = match delta {
                Some(d) => d,
                None => {
                    lambda *= self.config.lambda_up;
                    if lambda > self.config.max_lambda {
                        termination = LMTermination::DampingExhausted;
                        break;
                    }
                    continue;
                }
            };

            let mut trial: Vec<f64> = params.iter().zip(&delta).map(|(p, d)| p + d).collect();
            if let Some(b) = bounds {
                b.project(&mut trial);
            }

            let step_norm = trial
                .iter()
                .zip(&params)
                .map(|(t, p)| (t - p) * (t - p))
                .sum::<f64>()
                .sqrt();
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt().max(1.0);
            if step_norm / param_norm < self.config.param_tolerance {
                termination = LMTermination::ParameterTolerance;
                break;
            }

            let trial_r = residuals(&trial)?;
            let trial_ss = if trial_r.len() == r.len() {
                sum_of_squares(&trial_r)
            } else {
                f64::NAN
            };

            if trial_ss.is_finite() && trial_ss < ss {
                let reduction = (ss - trial_ss) / ss.max(f64::MIN_POSITIVE);
                params = trial;
                r = trial_r;
                ss = trial_ss;
                jacobian = None;
                lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
                if reduction < self.config.stagnation_tolerance {
                    termination = LMTermination::Stagnation;
                    break;
                }
            } else {
                lambda *= self.config.lambda_up;
                if lambda > self.config.max_lambda {
                    termination = LMTermination::DampingExhausted;
                    break;
                }
            }
        }

        if termination == LMTermination::MaxIterations && ss.sqrt() < self.config.tolerance {
            termination = LMTermination::ResidualTolerance;
        }

        Ok(LMResult {
            params,
            residual_ss: ss,
            initial_residual_ss: initial_ss,
            iterations,
            converged: termination.is_converged(),
            termination,
            final_lambda: lambda,
        })
    }
}

/// Solve (J^T J + λ diag(J^T J)) δ = -J^T r.
fn solve_normal_equations(jacobian: &[Vec<f64>], residuals: &[f64], lambda: f64) -> Option<Vec<f64>> {
    let n_params = jacobian.first().map_or(0, |row| row.len());

    let mut jtj = vec![vec![0.0; n_params]; n_params];
    let mut jtr = vec![0.0; n_params];
    for (row, &ri) in jacobian.iter().zip(residuals) {
        for i in 0..n_params {
            jtr[i] -= row[i] * ri;
            for j in 0..=i {
                jtj[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n_params {
        for j in 0..i {
            jtj[j][i] = jtj[i][j];
        }
    }

    // Marquardt scaling keeps the damping invariant to parameter units
    for (i, row) in jtj.iter_mut().enumerate() {
        let diag = row[i].max(1e-300);
        row[i] += lambda * diag;
    }

    solve_cholesky(&jtj, &jtr)
}

/// Compute the Jacobian by forward differences.
///
/// Bumps that would leave the box are taken backwards instead.
fn compute_jacobian<F, E>(
    residuals: &mut F,
    params: &[f64],
    r0: &[f64],
    bounds: Option<&ParameterBounds>,
    fd_bump: f64,
) -> Result<Vec<Vec<f64>>, E>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
    E: From<SolverError>,
{
    let n_params = params.len();
    let n_residuals = r0.len();
    let mut jacobian = vec![vec![0.0; n_params]; n_residuals];

    for j in 0..n_params {
        let mut h = fd_bump * params[j].abs().max(1.0);
        if let Some(b) = bounds {
            if params[j] + h > b.upper()[j] {
                h = -h;
            }
        }

        let mut bumped = params.to_vec();
        bumped[j] += h;
        let r_bumped = residuals(&bumped)?;
        if r_bumped.len() != n_residuals {
            return Err(SolverError::numerical_instability(format!(
                "residual length changed from {} to {}",
                n_residuals,
                r_bumped.len()
            ))
            .into());
        }

        for i in 0..n_residuals {
            let d = (r_bumped[i] - r0[i]) / h;
            if !d.is_finite() {
                return Err(SolverError::numerical_instability(format!(
                    "non-finite Jacobian entry for parameter {}",
                    j
                ))
                .into());
            }
            jacobian[i][j] = d;
        }
    }

    Ok(jacobian)
}

/// Compute sum of squares of a vector.
#[inline]
fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Solve Ax = b using Cholesky decomposition.
fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if !(sum > 0.0) {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // LMConfig Tests
    // ========================================

    #[test]
    fn test_config_default() {
        let config = LMConfig::default();
        assert!((config.tolerance - 1e-10).abs() < 1e-15);
        assert_eq!(config.max_iterations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_presets() {
        assert!(LMConfig::fast().tolerance > LMConfig::high_precision().tolerance);
        assert!(LMConfig::high_precision().max_iterations >= 500);
        assert!(LMConfig::fast().validate().is_ok());
        assert!(LMConfig::high_precision().validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects_bad_damping() {
        let config = LMConfig {
            lambda_up: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LMConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    // ========================================
    // ParameterBounds Tests
    // ========================================

    #[test]
    fn test_bounds_project() {
        let bounds = ParameterBounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
        let mut p = vec![2.0, -3.0];
        bounds.project(&mut p);
        assert_eq!(p, vec![1.0, -1.0]);
        assert!(bounds.contains(&p));
    }

    #[test]
    fn test_bounds_invalid() {
        assert!(ParameterBounds::new(vec![1.0], vec![0.0]).is_err());
        assert!(ParameterBounds::new(vec![0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_result_rmse() {
        let result = LMResult {
            params: vec![1.0],
            residual_ss: 4.0,
            initial_residual_ss: 9.0,
            iterations: 10,
            converged: true,
            termination: LMTermination::Stagnation,
            final_lambda: 1e-5,
        };
        assert!((result.rmse(4) - 1.0).abs() < 1e-10);
        assert_eq!(result.rmse(0), 0.0);
    }

    // ========================================
    // Unconstrained Solve Tests
    // ========================================

    #[test]
    fn test_solve_simple_linear() {
        let residuals = |params: &[f64]| -> Vec<f64> { vec![params[0] - 2.0, params[1] - 3.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();

        assert!(result.converged);
        assert!((result.params[0] - 2.0).abs() < 1e-6);
        assert!((result.params[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_solve_rosenbrock() {
        // Minimum at (1, 1)
        let residuals = |params: &[f64]| -> Vec<f64> {
            vec![10.0 * (params[1] - params[0] * params[0]), 1.0 - params[0]]
        };

        let config = LMConfig {
            max_iterations: 200,
            ..Default::default()
        };
        let solver = LevenbergMarquardtSolver::new(config);
        let result = solver.solve(residuals, vec![-1.2, 1.0]).unwrap();

        assert!((result.params[0] - 1.0).abs() < 1e-3);
        assert!((result.params[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_solve_exponential_fit() {
        let xs = [0.0_f64, 0.5, 1.0, 1.5, 2.0];
        let ys: Vec<f64> = xs.iter().map(|x| 0.8 * (-1.3 * x).exp()).collect();

        let residuals = |params: &[f64]| -> Vec<f64> {
            xs.iter()
                .zip(&ys)
                .map(|(x, y)| params[0] * (-params[1] * x).exp() - y)
                .collect()
        };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![1.0, 1.0]).unwrap();

        assert!(result.converged);
        assert!((result.params[0] - 0.8).abs() < 1e-6);
        assert!((result.params[1] - 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_solve_already_optimal() {
        let residuals = |params: &[f64]| -> Vec<f64> { vec![params[0] - 5.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![5.0]).unwrap();

        assert!(result.converged);
        assert_eq!(result.termination, LMTermination::ResidualTolerance);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_solve_empty_params() {
        let residuals = |_params: &[f64]| -> Vec<f64> { vec![1.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        assert!(solver.solve(residuals, vec![]).is_err());
    }

    #[test]
    fn test_solve_empty_residuals() {
        let residuals = |_params: &[f64]| -> Vec<f64> { vec![] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        assert!(solver.solve(residuals, vec![1.0]).is_err());
    }

    #[test]
    fn test_solve_badly_scaled_parameters() {
        // Parameters of very different magnitude
        let residuals = |p: &[f64]| -> Vec<f64> {
            vec![1e6 * (p[0] - 0.01), p[1] - 250.0, p[0] * p[1] - 2.5]
        };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.02, 100.0]).unwrap();
        assert!((result.params[0] - 0.01).abs() < 1e-8);
        assert!((result.params[1] - 250.0).abs() < 1e-4);
    }

    // ========================================
    // Infeasible and Constrained Tests
    // ========================================

    #[test]
    fn test_infeasible_target_never_worse() {
        // Three incompatible targets for a single parameter
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 1.0, p[0] - 2.0, p[0] - 6.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.0]).unwrap();
        assert!(result.residual_ss <= result.initial_residual_ss);
        assert!((result.params[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounded_solution_sits_on_bound() {
        let residuals = |p: &[f64]| Ok::<Vec<f64>, SolverError>(vec![p[0] + 1.0, p[1] - 0.5]);
        let bounds = ParameterBounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver
            .try_solve(residuals, vec![0.5, 0.9], Some(&bounds))
            .unwrap();

        assert!(bounds.contains(&result.params));
        assert!(result.params[0].abs() < 1e-12);
        assert!((result.params[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_initial_guess_projected() {
        let residuals = |p: &[f64]| Ok::<Vec<f64>, SolverError>(vec![p[0] - 0.5]);
        let bounds = ParameterBounds::new(vec![0.0], vec![1.0]).unwrap();

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.try_solve(residuals, vec![4.0], Some(&bounds)).unwrap();
        // Measured from the projected start at 1.0
        assert!((result.initial_residual_ss - 0.25).abs() < 1e-12);
        assert!((result.params[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_dimension_mismatch() {
        let residuals = |p: &[f64]| Ok::<Vec<f64>, SolverError>(vec![p[0]]);
        let bounds = ParameterBounds::unbounded(2);
        let solver = LevenbergMarquardtSolver::with_defaults();
        assert!(solver.try_solve(residuals, vec![1.0], Some(&bounds)).is_err());
    }

    // ========================================
    // Fallible Residual Tests
    // ========================================

    #[derive(Debug)]
    enum FitError {
        Solver(SolverError),
        Pricing,
    }

    impl From<SolverError> for FitError {
        fn from(err: SolverError) -> Self {
            FitError::Solver(err)
        }
    }

    #[test]
    fn test_residual_error_aborts() {
        let residuals = |p: &[f64]| {
            if p[0] > 1.5 {
                Err(FitError::Pricing)
            } else {
                Ok(vec![p[0] - 3.0])
            }
        };
        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.try_solve(residuals, vec![1.0], None);
        assert!(matches!(result, Err(FitError::Pricing)));
    }

    #[test]
    fn test_non_finite_trial_is_rejected() {
        // Residuals blow up beyond p = 2.5; the solver must back off
        let residuals = |p: &[f64]| {
            if p[0] > 2.5 {
                Ok::<Vec<f64>, FitError>(vec![f64::INFINITY])
            } else {
                Ok(vec![(p[0] - 2.0) * 10.0])
            }
        };
        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.try_solve(residuals, vec![0.0], None).unwrap();
        assert!((result.params[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_initial_residual() {
        let residuals = |_p: &[f64]| Ok::<Vec<f64>, FitError>(vec![f64::NAN]);
        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.try_solve(residuals, vec![0.0], None);
        assert!(matches!(
            result,
            Err(FitError::Solver(SolverError::NumericalInstability(_)))
        ));
    }

    #[test]
    fn test_flat_function_exhausts_damping() {
        // Constant residual: no step can improve it
        let residuals = |_p: &[f64]| -> Vec<f64> { vec![1.0] };
        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.0]).unwrap();
        assert!(!result.converged || result.termination == LMTermination::ParameterTolerance);
        assert_eq!(result.residual_ss, 1.0);
    }

    // ========================================
    // Linear Algebra Tests
    // ========================================

    #[test]
    fn test_cholesky_simple() {
        // 4*x0 + 2*x1 = 8, 2*x0 + 2*x1 = 5
        let a = vec![vec![4.0, 2.0], vec![2.0, 2.0]];
        let b = vec![8.0, 5.0];

        let x = solve_cholesky(&a, &b).unwrap();
        assert!((x[0] - 1.5).abs() < 1e-10);
        assert!((x[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cholesky_non_positive_definite() {
        let a = vec![vec![-1.0, 0.0], vec![0.0, 1.0]];
        assert!(solve_cholesky(&a, &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_jacobian_linear() {
        let mut residuals =
            |p: &[f64]| Ok::<Vec<f64>, SolverError>(vec![2.0 * p[0] + 3.0 * p[1]]);

        let params = vec![1.0, 1.0];
        let r0 = residuals(&params).unwrap();
        let jacobian = compute_jacobian(&mut residuals, &params, &r0, None, 1e-7).unwrap();

        assert!((jacobian[0][0] - 2.0).abs() < 1e-5);
        assert!((jacobian[0][1] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_jacobian_backward_at_upper_bound() {
        let mut residuals = |p: &[f64]| {
            assert!(p[0] <= 1.0);
            Ok::<Vec<f64>, SolverError>(vec![p[0] * p[0]])
        };
        let bounds = ParameterBounds::new(vec![0.0], vec![1.0]).unwrap();
        let params = vec![1.0];
        let r0 = residuals(&params).unwrap();
        let jacobian = compute_jacobian(&mut residuals, &params, &r0, Some(&bounds), 1e-7).unwrap();
        assert!((jacobian[0][0] - 2.0).abs() < 1e-5);
    }
}
